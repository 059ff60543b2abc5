//! Batch training pipeline
//!
//! Runs ingestion, transformation, candidate selection and persistence as a
//! sequence of stages. Any stage error stops the run and is reported with the
//! stage it came from.

mod ingestion;
mod train;

pub use ingestion::{DataIngestion, SplitPaths};
pub use train::{TrainingOutcome, TrainingPipeline, TransformedSplits};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of a training run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    /// Not started yet
    Pending,
    Ingesting,
    Transforming,
    Training,
    Persisting,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Pending => "Pending",
            PipelineStage::Ingesting => "Ingesting",
            PipelineStage::Transforming => "Transforming",
            PipelineStage::Training => "Training",
            PipelineStage::Persisting => "Persisting",
            PipelineStage::Done => "Done",
            PipelineStage::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
