//! Per-second feature engine
//!
//! `FeatureEngine` consumes one breathing/cardiac rate pair per second plus
//! snapshots of the amplitude histories, maintains the derived-feature
//! smoothing horizons, and produces a `FeatureSample` whose fields appear
//! one by one as their windows warm. The epoch aggregator averages these
//! samples over each minute.

use chrono::{NaiveDateTime, Timelike};

use crate::dsp::{savgol_31, SAVGOL_WINDOW};
use crate::features::{
    self, amplitude_difference_accumulation, body_movement_index, deep_parameter,
    movement_density, rate_dispersion, rate_variance, rem_contrast, seconds_since_evening,
    spectral_energy_bands,
};
use crate::types::RateChannel;
use crate::window::HistoryWindow;

/// One second's worth of derived features; `None` until the backing window
/// for that feature is warmed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureSample {
    pub breath: Option<f64>,
    pub heart: Option<f64>,
    pub bmi: Option<f64>,
    pub deep_p: Option<f64>,
    pub ada_br: Option<f64>,
    pub ada_hr: Option<f64>,
    pub var_rpm: Option<f64>,
    pub var_hpm: Option<f64>,
    pub rem_parameter: Option<f64>,
    pub mov_dens: Option<f64>,
    pub lf: Option<f64>,
    pub hf: Option<f64>,
    pub lfhf: Option<f64>,
    pub s_hf: Option<f64>,
    pub s_lfhf: Option<f64>,
    pub tf_rsa: Option<f64>,
    pub tm_hr: Option<f64>,
    pub sf_rsa: Option<f64>,
    pub sm_hr: Option<f64>,
    pub sdf_rsa: Option<f64>,
    pub sdm_hr: Option<f64>,
    pub stf_rsa: Option<f64>,
    pub stm_hr: Option<f64>,
    pub time: Option<f64>,
}

/// Smoothed mean and residual-smoothed mean of a 31-sample rate tail.
fn savgol_pair(tail: &[f64]) -> (f64, f64) {
    let (smoothed, mean) = savgol_31(tail, 3);
    let residuals: Vec<f64> = tail
        .iter()
        .zip(smoothed.iter())
        .map(|(raw, fit)| (raw - fit).abs())
        .collect();
    let (_, residual_mean) = savgol_31(&residuals, 3);
    (mean, residual_mean)
}

/// Stateful producer of per-second feature samples.
pub struct FeatureEngine {
    breath_rates: HistoryWindow,
    heart_rates: HistoryWindow,
    tf_rsa_history: HistoryWindow,
    tm_hr_history: HistoryWindow,
    hf_history: HistoryWindow,
    lfhf_history: HistoryWindow,
}

impl Default for FeatureEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureEngine {
    pub fn new() -> Self {
        Self {
            breath_rates: HistoryWindow::new(features::VARIANCE_WINDOW),
            heart_rates: HistoryWindow::new(features::VARIANCE_WINDOW),
            tf_rsa_history: HistoryWindow::new(SAVGOL_WINDOW),
            tm_hr_history: HistoryWindow::new(SAVGOL_WINDOW),
            hf_history: HistoryWindow::new(SAVGOL_WINDOW),
            lfhf_history: HistoryWindow::new(SAVGOL_WINDOW),
        }
    }

    /// True once the rate-variance windows have filled; the aggregator uses
    /// this to time its warm-up cycles.
    pub fn variance_ready(&self) -> bool {
        self.breath_rates.is_ready()
    }

    /// Ingest one second of rates plus the current amplitude histories.
    ///
    /// `amplitude` is the 1200-sample history behind the movement features
    /// and `spectral` the 6000-sample history behind the band energies; pass
    /// `None` while those windows are still warming.
    pub fn observe(
        &mut self,
        breath_rate: f64,
        heart_rate: f64,
        amplitude: Option<&[f64]>,
        spectral: Option<&[f64]>,
        now: NaiveDateTime,
    ) -> FeatureSample {
        self.breath_rates.push(breath_rate);
        self.heart_rates.push(heart_rate);

        let mut sample = FeatureSample {
            breath: Some(breath_rate),
            heart: Some(heart_rate),
            time: Some(seconds_since_evening(now.hour(), now.minute(), now.second())),
            ..FeatureSample::default()
        };

        if let Some(tail) = self.breath_rates.tail(features::DISPERSION_WINDOW) {
            let tf_rsa = rate_dispersion(&tail);
            sample.tf_rsa = Some(tf_rsa);
            self.tf_rsa_history.push(tf_rsa);
        }
        if let Some(tail) = self.heart_rates.tail(features::DISPERSION_WINDOW) {
            let tm_hr = rate_dispersion(&tail);
            sample.tm_hr = Some(tm_hr);
            self.tm_hr_history.push(tm_hr);
        }

        if let Some(tail) = self.breath_rates.tail(SAVGOL_WINDOW) {
            let (sf_rsa, sdf_rsa) = savgol_pair(&tail);
            sample.sf_rsa = Some(sf_rsa);
            sample.sdf_rsa = Some(sdf_rsa);
        }
        if let Some(tail) = self.heart_rates.tail(SAVGOL_WINDOW) {
            let (sm_hr, sdm_hr) = savgol_pair(&tail);
            sample.sm_hr = Some(sm_hr);
            sample.sdm_hr = Some(sdm_hr);
        }

        if self.tf_rsa_history.is_ready() {
            let (_, mean) = savgol_31(&self.tf_rsa_history.snapshot(), 2);
            sample.stf_rsa = Some(mean);
        }
        if self.tm_hr_history.is_ready() {
            let (_, mean) = savgol_31(&self.tm_hr_history.snapshot(), 2);
            sample.stm_hr = Some(mean);
        }

        if self.breath_rates.is_ready() {
            sample.var_rpm = Some(rate_variance(&self.breath_rates.snapshot()));
            sample.var_hpm = Some(rate_variance(&self.heart_rates.snapshot()));
        }

        if let Some(tail) = self.breath_rates.tail(features::REM_WINDOW) {
            sample.rem_parameter = Some(rem_contrast(&tail));
        }

        if let Some(amplitude) = amplitude {
            sample.mov_dens = Some(movement_density(amplitude));
            let bmi = body_movement_index(amplitude);
            sample.bmi = Some(bmi);
            sample.ada_br = Some(amplitude_difference_accumulation(
                amplitude,
                RateChannel::Breathing,
            ));
            sample.ada_hr = Some(amplitude_difference_accumulation(
                amplitude,
                RateChannel::Cardiac,
            ));
            if let Some(tail) = self.heart_rates.tail(60) {
                let heart_mean = tail.iter().sum::<f64>() / 60.0;
                sample.deep_p = Some(deep_parameter(bmi, heart_mean));
            }
        }

        if let Some(spectral) = spectral {
            let (lf, hf, lfhf) = spectral_energy_bands(spectral);
            sample.lf = Some(lf);
            sample.hf = Some(hf);
            sample.lfhf = Some(lfhf);
            self.hf_history.push(hf);
            self.lfhf_history.push(lfhf);
            if self.hf_history.is_ready() {
                let (_, s_hf) = savgol_31(&self.hf_history.snapshot(), 3);
                let (_, s_lfhf) = savgol_31(&self.lfhf_history.snapshot(), 3);
                sample.s_hf = Some(s_hf);
                sample.s_lfhf = Some(s_lfhf);
            }
        }

        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tick_time(offset: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .and_then(|d| d.and_hms_opt(22, 0, 0))
            .map(|t| t + chrono::Duration::seconds(offset))
            .unwrap()
    }

    #[test]
    fn test_rates_and_time_always_present() {
        let mut engine = FeatureEngine::new();
        let sample = engine.observe(16.0, 62.0, None, None, tick_time(0));
        assert_eq!(sample.breath, Some(16.0));
        assert_eq!(sample.heart, Some(62.0));
        assert_eq!(sample.time, Some(2.0 * 3600.0));
        assert_eq!(sample.tf_rsa, None);
        assert_eq!(sample.var_rpm, None);
        assert_eq!(sample.lf, None);
    }

    #[test]
    fn test_dispersion_appears_after_ten_ticks() {
        let mut engine = FeatureEngine::new();
        let mut sample = FeatureSample::default();
        for i in 0..10 {
            sample = engine.observe(16.0, 62.0, None, None, tick_time(i));
        }
        assert_eq!(sample.tf_rsa, Some(0.0));
        assert_eq!(sample.tm_hr, Some(0.0));
        assert_eq!(sample.sf_rsa, None);
    }

    #[test]
    fn test_smoothed_features_after_thirty_one_ticks() {
        let mut engine = FeatureEngine::new();
        let mut sample = FeatureSample::default();
        for i in 0..31 {
            sample = engine.observe(16.0 + (i % 3) as f64 * 0.1, 62.0, None, None, tick_time(i));
        }
        assert!(sample.sf_rsa.is_some());
        assert!(sample.sdf_rsa.is_some());
        assert!(sample.sm_hr.is_some());
        // The tf_rsa chain starts 9 ticks later than the raw rates, so its
        // own 31-window is not warmed yet.
        assert_eq!(sample.stf_rsa, None);
    }

    #[test]
    fn test_variance_and_rem_after_full_history() {
        let mut engine = FeatureEngine::new();
        let mut sample = FeatureSample::default();
        for i in 0..600 {
            sample = engine.observe(16.0, 62.0, None, None, tick_time(i));
        }
        assert_eq!(sample.var_rpm, Some(0.0));
        assert_eq!(sample.var_hpm, Some(0.0));
        assert_eq!(sample.rem_parameter, Some(0.0));
        assert!(sample.stf_rsa.is_some());
        assert!(engine.variance_ready());
    }

    #[test]
    fn test_amplitude_features_gated_on_snapshot() {
        let mut engine = FeatureEngine::new();
        let amplitude = vec![1.0; features::AMPLITUDE_WINDOW];
        let mut sample = FeatureSample::default();
        for i in 0..60 {
            sample = engine.observe(16.0, 62.0, Some(&amplitude), None, tick_time(i));
        }
        assert_eq!(sample.mov_dens, Some(0.0));
        assert_eq!(sample.bmi, Some(0.0));
        assert_eq!(sample.ada_br, Some(0.0));
        // Flat amplitude gives bmi 0, so deep_p collapses to 0.
        assert_eq!(sample.deep_p, Some(0.0));
    }

    #[test]
    fn test_spectral_features_feed_smoothing_chain() {
        let mut engine = FeatureEngine::new();
        let spectral: Vec<f64> = (0..features::SPECTRAL_WINDOW)
            .map(|i| (i as f64 * 0.13).sin())
            .collect();
        let mut sample = FeatureSample::default();
        for i in 0..31 {
            sample = engine.observe(16.0, 62.0, None, Some(&spectral), tick_time(i));
        }
        assert!(sample.lf.is_some());
        assert!(sample.hf.is_some());
        assert!(sample.s_hf.is_some());
        assert!(sample.s_lfhf.is_some());
    }
}
