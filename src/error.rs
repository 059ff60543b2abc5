//! Error types for the maintenance cost predictor

use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::PipelineStage;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, CostError>;

/// Main error type
#[derive(Error, Debug)]
pub enum CostError {
    /// A required column is missing or has the wrong type
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// A component was used in transform/predict mode before being fitted
    #[error("{0} is not fitted")]
    NotFitted(String),

    /// A fitted component was asked to re-estimate its parameters
    #[error("{0} is already fitted; create a new instance to refit")]
    AlreadyFitted(String),

    /// A single input value is outside its declared domain
    #[error("Validation error on field '{field}': {reason}")]
    ValidationError { field: String, reason: String },

    /// A candidate regressor could not be fitted or evaluated
    #[error("Training error in candidate '{candidate}': {reason}")]
    TrainingError { candidate: String, reason: String },

    /// No trained artifact pair has been persisted yet
    #[error("Artifact missing: {}", path.display())]
    ArtifactMissing { path: PathBuf },

    /// Persisted preprocessor and model disagree with each other
    #[error("Artifact mismatch: {0}")]
    ArtifactMismatch(String),

    /// A training pipeline stage failed
    #[error("Pipeline failed during {stage}: {source}")]
    StageFailed {
        stage: PipelineStage,
        #[source]
        source: Box<CostError>,
    },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },
}

impl CostError {
    /// Build a validation error for `field`
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CostError::ValidationError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Build a training error for `candidate`
    pub fn training(candidate: impl Into<String>, reason: impl Into<String>) -> Self {
        CostError::TrainingError {
            candidate: candidate.into(),
            reason: reason.into(),
        }
    }

    /// Pipeline stage that produced this error, if any
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            CostError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Innermost error, skipping any stage wrapper
    pub fn root(&self) -> &CostError {
        match self {
            CostError::StageFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<polars::error::PolarsError> for CostError {
    fn from(err: polars::error::PolarsError) -> Self {
        CostError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for CostError {
    fn from(err: serde_json::Error) -> Self {
        CostError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for CostError {
    fn from(err: ndarray::ShapeError) -> Self {
        CostError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
