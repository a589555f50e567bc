//! Error types for Somnowave

use thiserror::Error;

/// Errors that can occur while acquiring or recording vital signs
#[derive(Debug, Error)]
pub enum VitalsError {
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("failed to open recording file {path}: {reason}")]
    RecorderOpen { path: String, reason: String },

    #[error("failed to append epoch record: {0}")]
    RecorderWrite(String),

    #[error("invalid classifier parameters: {0}")]
    ClassifierParams(String),

    #[error("invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
