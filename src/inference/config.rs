//! Inference configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the prediction service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Directory holding preprocessor.json and model.json
    pub artifact_dir: PathBuf,

    /// Predictions are never returned below this cost
    pub min_prediction: f64,

    /// Log a warning when a request carries a level unseen during training
    pub warn_on_unseen_category: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("artifacts"),
            min_prediction: 100.0,
            warn_on_unseen_category: true,
        }
    }
}

impl InferenceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    pub fn with_min_prediction(mut self, floor: f64) -> Self {
        self.min_prediction = floor;
        self
    }

    pub fn with_warn_on_unseen_category(mut self, warn: bool) -> Self {
        self.warn_on_unseen_category = warn;
        self
    }
}
