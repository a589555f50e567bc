//! Sleep-feature extraction
//!
//! Pure functions converting rate histories and raw-amplitude histories into
//! the scalar features aggregated per epoch. Each function assumes its input
//! window is already warmed; callers gate on `HistoryWindow::is_ready`.

use crate::dsp::{band_energy, IirFilter, HIGH_FREQ_BAND, LOW_FREQ_BAND};
use crate::types::RateChannel;

/// Rate samples consumed by [`rate_variance`].
pub const VARIANCE_WINDOW: usize = 600;

/// Amplitude samples behind the movement, BMI and ADA features.
pub const AMPLITUDE_WINDOW: usize = 1200;

/// Amplitude samples behind the spectral-energy features.
pub const SPECTRAL_WINDOW: usize = 6000;

/// Rate samples consumed by [`rem_contrast`].
pub const REM_WINDOW: usize = 300;

/// Rate samples consumed by [`rate_dispersion`].
pub const DISPERSION_WINDOW: usize = 10;

/// Within-group variance above which a four-sample group counts as
/// high-movement.
const MOVEMENT_VARIANCE_THRESHOLD: f64 = 0.045;

/// Variance of per-10-minute block means over a 600-sample rate history.
///
/// The history is split into 10 blocks of 60; squared deviations of the
/// block means from the overall mean are summed and divided by 9.
pub fn rate_variance(rates: &[f64]) -> f64 {
    debug_assert_eq!(rates.len(), VARIANCE_WINDOW);
    let overall = rates.iter().sum::<f64>() / VARIANCE_WINDOW as f64;
    let mut sum_sq = 0.0;
    for block in rates.chunks_exact(60) {
        let mean = block.iter().sum::<f64>() / 60.0;
        sum_sq += (mean - overall).powi(2);
    }
    sum_sq / 9.0
}

/// Percentage of high-movement four-sample groups in the amplitude history.
///
/// 120 consecutive groups of four are tested; a group is high-movement when
/// the variance of its values (rounded to 8 decimals, divisor 3) exceeds the
/// movement threshold. The result is `high_groups / 120 * 100`.
pub fn movement_density(amplitude: &[f64]) -> f64 {
    debug_assert!(amplitude.len() >= 480);
    let mut high = 0usize;
    for group in amplitude[..480].chunks_exact(4) {
        let rounded: Vec<f64> = group
            .iter()
            .map(|v| (v * 1.0e8).round() / 1.0e8)
            .collect();
        let mean = rounded.iter().sum::<f64>() / 4.0;
        let variance = rounded.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 3.0;
        if variance > MOVEMENT_VARIANCE_THRESHOLD {
            high += 1;
        }
    }
    high as f64 / 120.0 * 100.0
}

/// Population standard deviation of the last 10 rate samples (tfRSA/tmHR).
pub fn rate_dispersion(rates: &[f64]) -> f64 {
    debug_assert_eq!(rates.len(), DISPERSION_WINDOW);
    let mean = rates.iter().sum::<f64>() / DISPERSION_WINDOW as f64;
    let variance =
        rates.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / DISPERSION_WINDOW as f64;
    variance.sqrt()
}

/// Body-movement index over the leading 60 samples of the amplitude history.
///
/// The mean of the first 10 samples seeds a running minimum; six consecutive
/// 10-sample block means are compared against it and the excess over the
/// final minimum is summed.
pub fn body_movement_index(amplitude: &[f64]) -> f64 {
    debug_assert!(amplitude.len() >= 60);
    let mut minimum = amplitude[..10].iter().sum::<f64>() / 10.0;
    let mut block_means = [0.0; 6];
    for (i, block) in amplitude[..60].chunks_exact(10).enumerate() {
        let mean = block.iter().sum::<f64>() / 10.0;
        block_means[i] = mean;
        if mean < minimum {
            minimum = mean;
        }
    }
    block_means.iter().map(|m| m - minimum).sum()
}

/// Deep-sleep parameter: `bmi / (heart_mean + bmi)`, 0 when degenerate.
pub fn deep_parameter(bmi: f64, heart_mean: f64) -> f64 {
    let denom = heart_mean + bmi;
    if denom == 0.0 {
        0.0
    } else {
        bmi / denom
    }
}

/// REM contrast over a 300-sample rate history.
///
/// Five overlapping 60-sample windows step by 30; each contributes the
/// absolute difference between the means of its first and last 30 samples,
/// and the contributions are averaged.
pub fn rem_contrast(rates: &[f64]) -> f64 {
    debug_assert_eq!(rates.len(), REM_WINDOW);
    let mut total = 0.0;
    for i in 0..5 {
        let former = rates[i * 30..(i + 1) * 30].iter().sum::<f64>() / 30.0;
        let latter = rates[(i + 1) * 30..(i + 2) * 30].iter().sum::<f64>() / 30.0;
        total += (former - latter).abs();
    }
    total / 5.0
}

/// Amplitude-difference accumulation over the 1200-sample amplitude history.
///
/// The history is cut into channel-sized blocks (20 samples for breathing,
/// 4 for cardiac); absolute differences between consecutive block means are
/// summed, measuring how much the signal envelope wanders over the minute.
pub fn amplitude_difference_accumulation(amplitude: &[f64], channel: RateChannel) -> f64 {
    debug_assert_eq!(amplitude.len(), AMPLITUDE_WINDOW);
    let block = match channel {
        RateChannel::Breathing => 20,
        RateChannel::Cardiac => 4,
    };
    let means: Vec<f64> = amplitude
        .chunks_exact(block)
        .map(|c| c.iter().sum::<f64>() / block as f64)
        .collect();
    means.windows(2).map(|w| (w[1] - w[0]).abs()).sum()
}

/// Seconds elapsed since 20:00, wrapping at midnight.
pub fn seconds_since_evening(hours: u32, minutes: u32, seconds: u32) -> f64 {
    (((hours + 24 - 20) % 24) * 3600 + minutes * 60 + seconds) as f64
}

/// Low- and high-band spectral energies of the amplitude history, plus
/// their ratio.
///
/// Each band applies its narrowband filter to the window and sums the
/// squared spectral magnitudes of the result. The ratio is `hf / lf`, or 0
/// when the low band carries no energy.
pub fn spectral_energy_bands(amplitude: &[f64]) -> (f64, f64, f64) {
    let lf = filtered_energy(&LOW_FREQ_BAND, amplitude);
    let hf = filtered_energy(&HIGH_FREQ_BAND, amplitude);
    let ratio = if lf == 0.0 { 0.0 } else { hf / lf };
    (lf, hf, ratio)
}

fn filtered_energy(filter: &IirFilter, signal: &[f64]) -> f64 {
    band_energy(&filter.apply(signal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_variance_constant_is_zero() {
        let rates = vec![16.5; VARIANCE_WINDOW];
        assert_eq!(rate_variance(&rates), 0.0);
    }

    #[test]
    fn test_rate_variance_block_step() {
        // First five blocks at 10, last five at 20: block means deviate by
        // 5 from the overall mean of 15, so the sum is 10 * 25 / 9.
        let mut rates = vec![10.0; VARIANCE_WINDOW];
        for value in rates.iter_mut().skip(300) {
            *value = 20.0;
        }
        let expected = 10.0 * 25.0 / 9.0;
        assert!((rate_variance(&rates) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_movement_density_identical_values() {
        let amplitude = vec![3.25; AMPLITUDE_WINDOW];
        assert_eq!(movement_density(&amplitude), 0.0);
    }

    #[test]
    fn test_movement_density_saturated() {
        // Alternating +-1 gives every group variance 4/3 > 0.045.
        let amplitude: Vec<f64> = (0..AMPLITUDE_WINDOW)
            .map(|i| if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        assert_eq!(movement_density(&amplitude), 100.0);
    }

    #[test]
    fn test_dispersion_of_constant_rates() {
        assert_eq!(rate_dispersion(&[14.0; DISPERSION_WINDOW]), 0.0);
    }

    #[test]
    fn test_dispersion_population_divisor() {
        let rates = [0.0, 0.0, 0.0, 0.0, 0.0, 10.0, 10.0, 10.0, 10.0, 10.0];
        // Mean 5, every deviation 5, population std = 5.
        assert_eq!(rate_dispersion(&rates), 5.0);
    }

    #[test]
    fn test_bmi_flat_signal_is_zero() {
        assert_eq!(body_movement_index(&vec![7.0; AMPLITUDE_WINDOW]), 0.0);
    }

    #[test]
    fn test_bmi_excess_over_minimum() {
        // Blocks: 1,1,1,2,2,2 -> minimum 1, excess 0+0+0+1+1+1 = 3.
        let mut amplitude = vec![1.0; AMPLITUDE_WINDOW];
        for value in amplitude[30..60].iter_mut() {
            *value = 2.0;
        }
        assert!((body_movement_index(&amplitude) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_deep_parameter_degenerate() {
        assert_eq!(deep_parameter(0.0, 0.0), 0.0);
        assert!((deep_parameter(20.0, 60.0) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_rem_contrast_step() {
        // Constant halves differ only in the middle window.
        let mut rates = vec![12.0; REM_WINDOW];
        for value in rates.iter_mut().skip(150) {
            *value = 18.0;
        }
        // Of the block pairs (0,1)..(4,5), only (4,5) straddles the step,
        // contributing |12 - 18| = 6.
        assert!((rem_contrast(&rates) - 6.0 / 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_ada_flat_signal_is_zero() {
        let amplitude = vec![4.5; AMPLITUDE_WINDOW];
        assert_eq!(
            amplitude_difference_accumulation(&amplitude, RateChannel::Breathing),
            0.0
        );
        assert_eq!(
            amplitude_difference_accumulation(&amplitude, RateChannel::Cardiac),
            0.0
        );
    }

    #[test]
    fn test_ada_cardiac_tracks_finer_blocks() {
        // A single 20-sample bump: breathing sees one block mean change,
        // cardiac sees five blocks change, so it accumulates more.
        let mut amplitude = vec![0.0; AMPLITUDE_WINDOW];
        for value in amplitude[100..120].iter_mut() {
            *value = 1.0;
        }
        let br = amplitude_difference_accumulation(&amplitude, RateChannel::Breathing);
        let hr = amplitude_difference_accumulation(&amplitude, RateChannel::Cardiac);
        assert!(hr > br);
    }

    #[test]
    fn test_time_feature_reference_points() {
        assert_eq!(seconds_since_evening(20, 0, 0), 0.0);
        assert_eq!(seconds_since_evening(21, 30, 15), 5415.0);
        // Wraps past midnight instead of growing beyond a day.
        assert_eq!(seconds_since_evening(2, 0, 0), 6.0 * 3600.0);
        assert_eq!(seconds_since_evening(19, 59, 59), 23.0 * 3600.0 + 59.0 * 60.0 + 59.0);
    }

    #[test]
    fn test_spectral_bands_of_silence() {
        let (lf, hf, ratio) = spectral_energy_bands(&vec![0.0; 512]);
        assert_eq!(lf, 0.0);
        assert_eq!(hf, 0.0);
        assert_eq!(ratio, 0.0);
    }

    #[test]
    fn test_spectral_bands_positive_on_noise() {
        let noisy: Vec<f64> = (0..512)
            .map(|i| ((i * 2654435761u64 as usize) % 1000) as f64 / 1000.0 - 0.5)
            .collect();
        let (lf, hf, ratio) = spectral_energy_bands(&noisy);
        assert!(lf > 0.0);
        assert!(hf > 0.0);
        assert!((ratio - hf / lf).abs() < 1e-12);
    }
}
