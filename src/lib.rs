//! Somnowave - On-device vitals engine for mmWave radar sleep monitoring
//!
//! Somnowave turns the raw byte stream of a vitals radar into a per-minute
//! sleep record through a deterministic pipeline: frame decoding → channel
//! history accumulation → per-second rate estimation → feature derivation →
//! epoch aggregation → stage classification → recording.
//!
//! ## Modules
//!
//! - **Acquisition**: transport abstraction and binary frame decoding
//! - **Rate pipeline**: per-second breathing and cardiac rate estimation
//! - **Features**: derived sleep features and the per-second engine
//! - **Epochs**: minute-aligned aggregation, classification and recording

pub mod classify;
pub mod dsp;
pub mod engine;
pub mod epoch;
pub mod error;
pub mod features;
pub mod frame;
pub mod monitor;
pub mod rate;
pub mod recorder;
pub mod transport;
pub mod types;
pub mod window;

pub use classify::{
    FixedTrustGate, LinearTrustGate, RateTrustGate, SleepStageClassifier, ThresholdSleepModel,
};
pub use engine::{FeatureEngine, FeatureSample};
pub use epoch::{BoundaryClock, EpochAggregator};
pub use error::VitalsError;
pub use frame::{FrameDecoder, VitalFrame};
pub use monitor::Monitor;
pub use rate::{RateEstimator, SensorAverages};
pub use recorder::{CsvRecorder, EpochSink};
pub use transport::{ReaderTransport, Transport};
pub use types::{
    EpochRecord, FeatureVector, RateChannel, RateEstimate, SleepStage, TrustSource,
};
pub use window::HistoryWindow;

/// Somnowave version embedded in session logs.
pub const SOMNOWAVE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for session provenance.
pub const PRODUCER_NAME: &str = "somnowave";
