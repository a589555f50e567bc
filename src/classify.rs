//! Trust gating and sleep-stage classification
//!
//! Two decision seams live here, both behind traits so deployments can swap
//! in models trained on their own hardware:
//! - `RateTrustGate` chooses, each second, between the phase-derived rate
//!   and the sensor's own time-domain estimate, and
//! - `SleepStageClassifier` maps a one-minute feature vector to a stage.
//!
//! The bundled implementations are linear: a weighted score over the gate
//! inputs and a small threshold cascade over the discriminative features.
//! Both serialize to JSON so parameter sets can ship separately from the
//! binary.

use serde::{Deserialize, Serialize};

use crate::error::VitalsError;
use crate::types::{FeatureVector, SleepStage, TrustSource};

/// Decides which rate source to trust for one second.
///
/// The input vector is `[spectral_peak, sensor_fft_mean, sensor_xcorr_mean]`
/// for the channel being estimated.
pub trait RateTrustGate {
    fn trust(&self, inputs: &[f64; 3]) -> TrustSource;
}

/// Linear trust gate: `w . x + b > 0` selects the sensor estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearTrustGate {
    pub weights: [f64; 3],
    pub bias: f64,
}

impl LinearTrustGate {
    pub fn new(weights: [f64; 3], bias: f64) -> Self {
        Self { weights, bias }
    }

    /// Default parameters for the breathing channel: prefer the computed
    /// rate unless the spectral peak collapses toward zero.
    pub fn breathing_default() -> Self {
        Self::new([-1.0, 0.0, 0.0], 0.05)
    }

    /// Default parameters for the cardiac channel.
    pub fn cardiac_default() -> Self {
        Self::new([-1.0, 0.0, 0.0], 0.5)
    }

    pub fn from_json(json: &str) -> Result<Self, VitalsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, VitalsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl RateTrustGate for LinearTrustGate {
    fn trust(&self, inputs: &[f64; 3]) -> TrustSource {
        let score: f64 = self
            .weights
            .iter()
            .zip(inputs)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias;
        if score > 0.0 {
            TrustSource::Sensor
        } else {
            TrustSource::Computed
        }
    }
}

/// Gate that always answers the same; used in replay and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedTrustGate(pub TrustSource);

impl RateTrustGate for FixedTrustGate {
    fn trust(&self, _inputs: &[f64; 3]) -> TrustSource {
        self.0
    }
}

/// Maps a one-minute feature vector to a sleep stage.
pub trait SleepStageClassifier {
    fn classify(&self, features: &FeatureVector) -> SleepStage;
}

/// Threshold cascade over the three most discriminative features.
///
/// Movement density dominates (body movement implies wake), then the deep
/// parameter, then the REM parameter; anything left is light sleep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdSleepModel {
    pub awake_movement_threshold: f64,
    pub deep_threshold: f64,
    pub rem_threshold: f64,
}

impl Default for ThresholdSleepModel {
    fn default() -> Self {
        Self {
            awake_movement_threshold: 40.0,
            deep_threshold: 0.55,
            rem_threshold: 1.2,
        }
    }
}

impl ThresholdSleepModel {
    pub fn from_json(json: &str) -> Result<Self, VitalsError> {
        let model: Self = serde_json::from_str(json)?;
        if model.awake_movement_threshold < 0.0 || model.awake_movement_threshold > 100.0 {
            return Err(VitalsError::ClassifierParams(format!(
                "awake_movement_threshold {} outside 0..100",
                model.awake_movement_threshold
            )));
        }
        Ok(model)
    }

    pub fn to_json(&self) -> Result<String, VitalsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl SleepStageClassifier for ThresholdSleepModel {
    fn classify(&self, features: &FeatureVector) -> SleepStage {
        if features.mov_dens > self.awake_movement_threshold {
            SleepStage::Awake
        } else if features.deep_p > self.deep_threshold {
            SleepStage::Deep
        } else if features.rem_parameter > self.rem_threshold {
            SleepStage::Rem
        } else {
            SleepStage::Light
        }
    }
}
