//! Application configuration
//!
//! Every section has defaults, so a config file only needs the values it
//! changes.

use crate::error::{CostError, Result};
use crate::inference::InferenceConfig;
use crate::synthetic::GeneratorConfig;
use crate::training::TrainingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File locations used by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Raw table written by the generator and read by ingestion
    pub raw_data: PathBuf,
    /// Directory receiving train.csv and test.csv
    pub split_dir: PathBuf,
    /// Directory receiving preprocessor.json and model.json
    pub artifact_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_data: PathBuf::from("data/raw/maintenance_data.csv"),
            split_dir: PathBuf::from("data/processed"),
            artifact_dir: PathBuf::from("artifacts"),
        }
    }
}

impl PathsConfig {
    /// Lay everything out under one root directory
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            raw_data: root.join("raw").join("maintenance_data.csv"),
            split_dir: root.join("processed"),
            artifact_dir: root.join("artifacts"),
        }
    }

    pub fn train_csv(&self) -> PathBuf {
        self.split_dir.join("train.csv")
    }

    pub fn test_csv(&self) -> PathBuf {
        self.split_dir.join("test.csv")
    }
}

/// Complete configuration for the binary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub generator: GeneratorConfig,
    pub training: TrainingConfig,
    pub inference: InferenceConfig,
}

impl AppConfig {
    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            CostError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|e| {
            CostError::ConfigError(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Point the inference artifact directory at the training output
    pub fn with_paths(mut self, paths: PathsConfig) -> Self {
        self.inference.artifact_dir = paths.artifact_dir.clone();
        self.paths = paths;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.training.validate().map_err(CostError::ConfigError)?;
        if self.generator.n_samples == 0 {
            return Err(CostError::ConfigError("generator.n_samples must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"training": {"random_state": 7}}"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.training.random_state, 7);
        assert_eq!(config.training.test_size, 0.2);
        assert_eq!(config.generator, GeneratorConfig::default());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = AppConfig::default().with_paths(PathsConfig::under(dir.path()));
        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"training": {"test_size": 0.0}}"#).unwrap();
        assert!(matches!(AppConfig::load(&path), Err(CostError::ConfigError(_))));
    }

    #[test]
    fn test_split_paths() {
        let paths = PathsConfig::under("/tmp/run");
        assert_eq!(paths.train_csv(), PathBuf::from("/tmp/run/processed/train.csv"));
        assert_eq!(paths.test_csv(), PathBuf::from("/tmp/run/processed/test.csv"));
    }
}
