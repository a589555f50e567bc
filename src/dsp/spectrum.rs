//! Real-input spectral estimation
//!
//! Thin wrappers over `rustfft` producing the two quantities the pipeline
//! needs: the dominant frequency of a filtered window and the total energy
//! of a band-filtered window. Only the half spectrum (bins `0..n/2`) is
//! consulted; real input makes the upper half redundant.

use rustfft::{num_complex::Complex, FftPlanner};

fn half_spectrum(signal: &[f64]) -> Vec<Complex<f64>> {
    let n = signal.len();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    let mut buf: Vec<Complex<f64>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    fft.process(&mut buf);
    buf.truncate(n / 2);
    buf
}

/// Frequency of the maximum-magnitude bin, scaled so the half spectrum
/// spans `0..full_scale_hz`.
pub fn spectral_peak_hz(signal: &[f64], full_scale_hz: f64) -> f64 {
    if signal.len() < 2 {
        return 0.0;
    }
    let spectrum = half_spectrum(signal);
    let mut max_bin = 0;
    let mut max_mag = spectrum[0].norm();
    for (bin, value) in spectrum.iter().enumerate().skip(1) {
        let mag = value.norm();
        if mag > max_mag {
            max_mag = mag;
            max_bin = bin;
        }
    }
    max_bin as f64 * full_scale_hz / (signal.len() / 2) as f64
}

/// Sum of squared magnitudes over the half spectrum.
pub fn band_energy(signal: &[f64]) -> f64 {
    if signal.len() < 2 {
        return 0.0;
    }
    half_spectrum(signal).iter().map(|v| v.norm_sqr()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_peak_of_pure_tone() {
        // 2 Hz tone sampled at 20 Hz over 400 samples; half spectrum spans
        // 0..10 Hz over 200 bins, so the peak lands on bin 40.
        let signal: Vec<f64> = (0..400)
            .map(|i| (2.0 * PI * 2.0 * i as f64 / 20.0).sin())
            .collect();
        let peak = spectral_peak_hz(&signal, 10.0);
        assert!((peak - 2.0).abs() < 0.1, "peak {peak}");
    }

    #[test]
    fn test_dc_peaks_at_zero() {
        let signal = vec![3.0; 128];
        assert_eq!(spectral_peak_hz(&signal, 10.0), 0.0);
    }

    #[test]
    fn test_energy_scales_with_amplitude() {
        let small: Vec<f64> = (0..256).map(|i| (i as f64 * 0.3).sin()).collect();
        let large: Vec<f64> = small.iter().map(|v| v * 2.0).collect();
        let e1 = band_energy(&small);
        let e2 = band_energy(&large);
        assert!(e1 > 0.0);
        // Doubling amplitude quadruples energy.
        assert!((e2 / e1 - 4.0).abs() < 0.1);
    }

    #[test]
    fn test_energy_of_silence() {
        assert_eq!(band_energy(&vec![0.0; 64]), 0.0);
        assert_eq!(band_energy(&[]), 0.0);
    }
}
