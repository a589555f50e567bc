//! Per-channel rate estimation
//!
//! Once per second the estimator derives a breathing or cardiac rate from
//! the 800-sample phase-peak history: phase differencing, impulse-noise
//! removal, band-pass filtering, spectral estimation, local smoothing,
//! peak/valley detection, proximity merging, candidate classification,
//! interval-based rate computation, a trust gate against the sensor's own
//! estimate, and physiological-range validation.

pub mod peaks;

use crate::classify::RateTrustGate;
use crate::dsp::{
    mlr_smooth, spectral_peak_hz, IirFilter, BREATHING_BANDPASS, CARDIAC_BANDPASS,
};
use crate::types::{RateChannel, RateEstimate, TrustSource};

use self::peaks::{classify_candidates, local_maxima, merge_features, Candidates};

/// Sensor sampling rate of the phase channel.
pub const SAMPLE_RATE_HZ: f64 = 20.0;

/// Samples per minute at the sensor rate; interval-to-rate conversion factor.
pub const SAMPLES_PER_MINUTE: f64 = 60.0 * SAMPLE_RATE_HZ;

/// Upper edge of the spectral axis reported by the peak estimate.
const SPECTRUM_FULL_SCALE_HZ: f64 = 10.0;

/// Channel-specific pipeline parameters.
struct ChannelParams {
    impulse_threshold: f64,
    bandpass: IirFilter,
    smoothing_half_window: usize,
    merge_threshold: usize,
    candidate_half_window: usize,
}

impl ChannelParams {
    fn for_channel(channel: RateChannel) -> Self {
        match channel {
            RateChannel::Breathing => Self {
                impulse_threshold: 1.5,
                bandpass: BREATHING_BANDPASS,
                smoothing_half_window: 2,
                merge_threshold: 22,
                candidate_half_window: 17,
            },
            RateChannel::Cardiac => Self {
                impulse_threshold: 1.5,
                bandpass: CARDIAC_BANDPASS,
                smoothing_half_window: 2,
                merge_threshold: 5,
                candidate_half_window: 4,
            },
        }
    }
}

/// 800-sample means of the sensor's own estimates, fed to the trust gate
/// and used as the fallback rate when the gate prefers the sensor.
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorAverages {
    /// Mean of the sensor's FFT-based rate estimate.
    pub fft_rate: f64,
    /// Mean of the sensor's cross-correlation rate estimate.
    pub xcorr_rate: f64,
    /// Mean of the sensor's time-domain rate estimate.
    pub time_domain_rate: f64,
}

/// First difference of the phase history; output length is input length - 1.
pub fn phase_difference(phase: &[f64]) -> Vec<f64> {
    phase.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Replace isolated impulse samples with the midpoint of their neighbors.
///
/// A sample is an impulse when both its forward and backward differences
/// exceed the threshold in the same direction. Edge samples are untouched.
/// Idempotent on signals with no samples exceeding the test.
pub fn remove_impulse_noise(signal: &[f64], threshold: f64) -> Vec<f64> {
    let mut output = signal.to_vec();
    for i in 1..signal.len().saturating_sub(1) {
        let forward = signal[i] - signal[i - 1];
        let backward = signal[i] - signal[i + 1];
        let spike_up = forward > threshold && backward > threshold;
        let spike_down = forward < -threshold && backward < -threshold;
        if spike_up || spike_down {
            output[i] = signal[i - 1] + (signal[i + 1] - signal[i - 1]) / 2.0;
        }
    }
    output
}

/// Mean interval between consecutive candidate indices.
fn mean_interval(points: &[usize]) -> f64 {
    let total: usize = points.windows(2).map(|w| w[1] - w[0]).sum();
    total as f64 / (points.len() - 1) as f64
}

/// Interval-based rate from the candidate sets.
///
/// Fewer than two candidates in both sets yields rate 0 (insufficient
/// evidence), which downstream validation then rejects.
pub fn interval_rate(candidates: &Candidates) -> f64 {
    let tops = candidates.tops.len() > 1;
    let bottoms = candidates.bottoms.len() > 1;
    match (tops, bottoms) {
        (false, false) => 0.0,
        (true, false) => SAMPLES_PER_MINUTE / mean_interval(&candidates.tops),
        (false, true) => SAMPLES_PER_MINUTE / mean_interval(&candidates.bottoms),
        (true, true) => {
            let combined =
                (mean_interval(&candidates.tops) + mean_interval(&candidates.bottoms)) / 2.0;
            SAMPLES_PER_MINUTE / combined
        }
    }
}

/// Accept `candidate` when inside the channel's physiological range,
/// otherwise fall back to the previous second's accepted value.
pub fn substitute(previous: f64, candidate: f64, channel: RateChannel) -> f64 {
    let (low, high) = channel.valid_range();
    if candidate < low || candidate > high {
        previous
    } else {
        candidate
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Per-channel rate estimator; stateless apart from its channel selection.
pub struct RateEstimator {
    channel: RateChannel,
}

impl RateEstimator {
    pub fn new(channel: RateChannel) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> RateChannel {
        self.channel
    }

    /// Run the full per-second pipeline over the warmed phase history.
    ///
    /// `previous` is the last accepted rate for this channel and becomes the
    /// fallback when the chosen rate fails range validation.
    pub fn estimate(
        &self,
        phase_history: &[f64],
        sensor: &SensorAverages,
        gate: &dyn RateTrustGate,
        previous: f64,
    ) -> RateEstimate {
        let params = ChannelParams::for_channel(self.channel);

        let diff = phase_difference(phase_history);
        let denoised = remove_impulse_noise(&diff, params.impulse_threshold);
        let filtered = params.bandpass.apply(&denoised);

        let spectral_peak = spectral_peak_hz(&filtered, SPECTRUM_FULL_SCALE_HZ);

        let smoothed = mlr_smooth(&filtered, params.smoothing_half_window);
        let peaks = local_maxima(&smoothed);
        let negated: Vec<f64> = smoothed.iter().map(|v| -v).collect();
        let valleys = local_maxima(&negated);

        let merged = merge_features(&smoothed, &peaks, &valleys, params.merge_threshold);
        let candidates = classify_candidates(&smoothed, &merged, params.candidate_half_window);
        let computed = interval_rate(&candidates);

        let source = gate.trust(&[spectral_peak, sensor.fft_rate, sensor.xcorr_rate]);
        let chosen = match source {
            TrustSource::Computed => computed,
            TrustSource::Sensor => sensor.time_domain_rate,
        };

        let accepted = round4(substitute(previous, chosen, self.channel));
        RateEstimate {
            channel: self.channel,
            rate: accepted,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FixedTrustGate;
    use std::f64::consts::PI;

    #[test]
    fn test_phase_difference_length_and_values() {
        let diff = phase_difference(&[1.0, 4.0, 2.0, 2.0]);
        assert_eq!(diff, vec![3.0, -2.0, 0.0]);
    }

    #[test]
    fn test_impulse_removal_idempotent_below_threshold() {
        let signal: Vec<f64> = (0..50).map(|i| (i as f64 * 0.2).sin()).collect();
        assert_eq!(remove_impulse_noise(&signal, 1.5), signal);
    }

    #[test]
    fn test_impulse_replaced_with_midpoint() {
        let signal = [0.0, 1.0, 9.0, 2.0, 3.0];
        let cleaned = remove_impulse_noise(&signal, 1.5);
        assert_eq!(cleaned[2], 1.5);
        // Edges untouched.
        assert_eq!(cleaned[0], 0.0);
        assert_eq!(cleaned[4], 3.0);
    }

    #[test]
    fn test_interval_rate_from_top_candidates() {
        let candidates = Candidates {
            tops: vec![0, 20, 40],
            bottoms: vec![],
        };
        assert_eq!(interval_rate(&candidates), 60.0);
    }

    #[test]
    fn test_interval_rate_insufficient_evidence() {
        let candidates = Candidates {
            tops: vec![5],
            bottoms: vec![80],
        };
        assert_eq!(interval_rate(&candidates), 0.0);
    }

    #[test]
    fn test_interval_rate_averages_both_sets() {
        let candidates = Candidates {
            tops: vec![0, 20, 40],    // mean interval 20
            bottoms: vec![10, 40, 70], // mean interval 30
        };
        // Combined interval 25 -> 48 per minute.
        assert_eq!(interval_rate(&candidates), 48.0);
    }

    #[test]
    fn test_substitute_rules() {
        assert_eq!(substitute(18.0, 5.0, RateChannel::Breathing), 18.0);
        assert_eq!(substitute(70.0, 75.0, RateChannel::Cardiac), 75.0);
        assert_eq!(substitute(70.0, 130.0, RateChannel::Cardiac), 70.0);
    }

    #[test]
    fn test_breathing_pipeline_on_pure_sinusoid() {
        // A 0.3 Hz phase sinusoid at 20 Hz sampling is ~18 breaths/min.
        let phase: Vec<f64> = (0..800)
            .map(|i| 10.0 * (2.0 * PI * 0.3 * i as f64 / SAMPLE_RATE_HZ).sin())
            .collect();
        let estimator = RateEstimator::new(RateChannel::Breathing);
        let gate = FixedTrustGate(TrustSource::Computed);
        let estimate = estimator.estimate(&phase, &SensorAverages::default(), &gate, 15.0);

        assert_eq!(estimate.source, TrustSource::Computed);
        assert!(
            (estimate.rate - 18.0).abs() <= 1.0,
            "rate {} not within 1 of 18",
            estimate.rate
        );
    }

    #[test]
    fn test_flat_phase_falls_back_to_previous() {
        let phase = vec![0.0; 800];
        let estimator = RateEstimator::new(RateChannel::Breathing);
        let gate = FixedTrustGate(TrustSource::Computed);
        let estimate = estimator.estimate(&phase, &SensorAverages::default(), &gate, 17.5);
        // Zero computed rate fails validation; previous value substitutes.
        assert_eq!(estimate.rate, 17.5);
    }

    #[test]
    fn test_sensor_source_selected_by_gate() {
        let phase = vec![0.0; 800];
        let estimator = RateEstimator::new(RateChannel::Cardiac);
        let gate = FixedTrustGate(TrustSource::Sensor);
        let sensor = SensorAverages {
            fft_rate: 70.0,
            xcorr_rate: 71.0,
            time_domain_rate: 72.5,
        };
        let estimate = estimator.estimate(&phase, &sensor, &gate, 68.0);
        assert_eq!(estimate.source, TrustSource::Sensor);
        assert_eq!(estimate.rate, 72.5);
    }
}
