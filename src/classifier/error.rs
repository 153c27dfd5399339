use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use super::backend::InferenceStrategy;

/// One failed inference attempt, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyFailure {
    pub strategy: InferenceStrategy,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Model artifact not found: {0}")]
    ArtifactNotFound(PathBuf),

    #[error("Failed to read model artifact {0}: {1}")]
    ArtifactLoad(String, String),

    #[error("Failed to parse model artifact: {0}")]
    ArtifactParse(String),

    #[error("Invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("Input rejected: {0}")]
    InputRejected(String),

    #[error("Feature shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Unknown label: {0}")]
    UnknownLabel(String),

    #[error("Term weights not exposed by this classifier")]
    WeightsUnavailable,

    #[error("All inference strategies failed ({} attempted)", .0.len())]
    AllStrategiesFailed(Vec<StrategyFailure>),
}
