//! Core types for the Somnowave pipeline
//!
//! This module defines the data structures that flow between pipeline stages:
//! physiological channels, per-second rate estimates, one-minute feature
//! vectors and the sleep-stage labels derived from them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Physiological channel selector.
///
/// Breathing and cardiac rates are derived by the same pipeline logic; the
/// channel chooses thresholds, filter coefficients and window sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateChannel {
    Breathing,
    Cardiac,
}

impl RateChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateChannel::Breathing => "breathing",
            RateChannel::Cardiac => "cardiac",
        }
    }

    /// Physiological range accepted for this channel (min, max), per minute.
    pub fn valid_range(&self) -> (f64, f64) {
        match self {
            RateChannel::Breathing => (10.0, 25.0),
            RateChannel::Cardiac => (40.0, 110.0),
        }
    }
}

/// Sleep stage classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepStage {
    Deep,
    Light,
    Rem,
    Awake,
}

impl SleepStage {
    /// Integer label written to the recording (matches the classifier output).
    pub fn as_label(&self) -> u8 {
        match self {
            SleepStage::Deep => 0,
            SleepStage::Light => 1,
            SleepStage::Rem => 2,
            SleepStage::Awake => 3,
        }
    }

    pub fn from_label(label: u8) -> Option<Self> {
        match label {
            0 => Some(SleepStage::Deep),
            1 => Some(SleepStage::Light),
            2 => Some(SleepStage::Rem),
            3 => Some(SleepStage::Awake),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SleepStage::Deep => "deep",
            SleepStage::Light => "light",
            SleepStage::Rem => "rem",
            SleepStage::Awake => "awake",
        }
    }
}

/// Which rate source the trust gate selected for a given second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustSource {
    /// The interval-based rate computed from the phase signal.
    Computed,
    /// The sensor's own time-domain estimate.
    Sensor,
}

/// One accepted per-second rate value for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateEstimate {
    pub channel: RateChannel,
    /// Breaths or beats per minute, rounded to 4 decimal places.
    pub rate: f64,
    /// Source chosen by the trust gate before validation.
    pub source: TrustSource,
}

/// The 24 scalar features aggregated over one epoch.
///
/// Field order matches the recording column order (after the leading
/// heart/breath swap performed by the recorder).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub breath: f64,
    pub heart: f64,
    pub bmi: f64,
    pub deep_p: f64,
    pub ada_br: f64,
    pub ada_hr: f64,
    pub var_rpm: f64,
    pub var_hpm: f64,
    pub rem_parameter: f64,
    pub mov_dens: f64,
    pub lf: f64,
    pub hf: f64,
    pub lfhf: f64,
    pub s_hf: f64,
    pub s_lfhf: f64,
    pub tf_rsa: f64,
    pub tm_hr: f64,
    pub sf_rsa: f64,
    pub sm_hr: f64,
    pub sdf_rsa: f64,
    pub sdm_hr: f64,
    pub stf_rsa: f64,
    pub stm_hr: f64,
    pub time: f64,
}

impl FeatureVector {
    /// Features in classifier input order.
    pub fn as_array(&self) -> [f64; 24] {
        [
            self.breath,
            self.heart,
            self.bmi,
            self.deep_p,
            self.ada_br,
            self.ada_hr,
            self.var_rpm,
            self.var_hpm,
            self.rem_parameter,
            self.mov_dens,
            self.lf,
            self.hf,
            self.lfhf,
            self.s_hf,
            self.s_lfhf,
            self.tf_rsa,
            self.tm_hr,
            self.sf_rsa,
            self.sm_hr,
            self.sdf_rsa,
            self.sdm_hr,
            self.stf_rsa,
            self.stm_hr,
            self.time,
        ]
    }

    /// Clamp every feature to the recording upper bound.
    pub fn clamped(mut self, bound: f64) -> Self {
        for value in [
            &mut self.breath,
            &mut self.heart,
            &mut self.bmi,
            &mut self.deep_p,
            &mut self.ada_br,
            &mut self.ada_hr,
            &mut self.var_rpm,
            &mut self.var_hpm,
            &mut self.rem_parameter,
            &mut self.mov_dens,
            &mut self.lf,
            &mut self.hf,
            &mut self.lfhf,
            &mut self.s_hf,
            &mut self.s_lfhf,
            &mut self.tf_rsa,
            &mut self.tm_hr,
            &mut self.sf_rsa,
            &mut self.sm_hr,
            &mut self.sdf_rsa,
            &mut self.sdm_hr,
            &mut self.stf_rsa,
            &mut self.stm_hr,
            &mut self.time,
        ] {
            if *value > bound {
                *value = bound;
            }
        }
        self
    }
}

/// One emitted epoch: the averaged feature vector plus its classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochRecord {
    /// Monitoring-session identifier for provenance.
    pub session_id: Uuid,
    /// Wall-clock time at the closing minute boundary.
    pub closed_at: NaiveDateTime,
    pub features: FeatureVector,
    pub stage: SleepStage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_label_round_trip() {
        for stage in [
            SleepStage::Deep,
            SleepStage::Light,
            SleepStage::Rem,
            SleepStage::Awake,
        ] {
            assert_eq!(SleepStage::from_label(stage.as_label()), Some(stage));
        }
        assert_eq!(SleepStage::from_label(7), None);
    }

    #[test]
    fn test_channel_ranges() {
        assert_eq!(RateChannel::Breathing.valid_range(), (10.0, 25.0));
        assert_eq!(RateChannel::Cardiac.valid_range(), (40.0, 110.0));
    }

    #[test]
    fn test_feature_vector_clamp() {
        let vector = FeatureVector {
            lf: 1.0e12,
            hf: 3.0,
            ..Default::default()
        };
        let clamped = vector.clamped(140_700_000.0);
        assert_eq!(clamped.lf, 140_700_000.0);
        assert_eq!(clamped.hf, 3.0);
    }
}
