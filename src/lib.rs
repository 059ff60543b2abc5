//! Maintenance cost predictor
//!
//! Estimates the cost of a machine maintenance event from six features:
//! age, usage hours, maintenance type, days since last maintenance, part
//! replacement and technician experience.
//!
//! # Modules
//!
//! - [`synthetic`] - Seeded synthetic maintenance dataset
//! - [`pipeline`] - Staged training run: ingest, transform, train, persist
//! - [`preprocessing`] - Scaling and one-of-k encoding with a fixed layout
//! - [`training`] - Candidate regressors and winner selection
//! - [`export`] - Persisted preprocessor/model pair
//! - [`inference`] - Prediction service over the persisted pair
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use maintenance_cost::prelude::*;
//!
//! # fn main() -> maintenance_cost::error::Result<()> {
//! let paths = PathsConfig::under("run");
//! MaintenanceDataGenerator::new(GeneratorConfig::default()).write_csv(&paths.raw_data)?;
//! TrainingPipeline::new(paths.clone(), TrainingConfig::default()).run()?;
//!
//! let service = PredictionService::new(InferenceConfig::new().with_artifact_dir(&paths.artifact_dir));
//! let cost = service.predict(&MaintenanceRecord::new(5.0, 5000.0, "Routine", 100, 0, 10.0))?;
//! assert!(cost >= 100.0);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod config;
pub mod schema;

pub mod preprocessing;
pub mod training;
pub mod inference;
pub mod pipeline;
pub mod export;
pub mod synthetic;

pub mod cli;
pub mod utils;

/// Commonly used types
pub mod prelude {
    pub use crate::config::{AppConfig, PathsConfig};
    pub use crate::error::{CostError, Result};
    pub use crate::export::{ArtifactStore, ModelMetadata};
    pub use crate::inference::{InferenceConfig, PredictionService};
    pub use crate::pipeline::{DataIngestion, PipelineStage, TrainingPipeline};
    pub use crate::preprocessing::{FeatureLayout, Preprocessor};
    pub use crate::schema::{FeatureSchema, MaintenanceRecord, PredictionRequest};
    pub use crate::synthetic::{GeneratorConfig, MaintenanceDataGenerator};
    pub use crate::training::{CandidateKind, ModelSelector, SelectionReport, TrainedModel, TrainingConfig};
}
