//! Prediction service backed by a persisted artifact pair

use parking_lot::RwLock;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::InferenceConfig;
use crate::error::Result;
use crate::export::{ArtifactPair, ArtifactStore};
use crate::schema::{FeatureSchema, MaintenanceRecord, PredictionRequest};

/// Snapshot of service counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStats {
    pub total_predictions: u64,
    pub rejected_inputs: u64,
    pub unseen_levels: u64,
}

/// Scores single maintenance events against the persisted model.
///
/// The artifact pair is loaded on first use and shared read-only between
/// callers. A newer pair is only picked up after [`PredictionService::reload`].
pub struct PredictionService {
    config: InferenceConfig,
    schema: FeatureSchema,
    store: ArtifactStore,
    loaded: RwLock<Option<Arc<ArtifactPair>>>,
    total_predictions: AtomicU64,
    rejected_inputs: AtomicU64,
    unseen_levels: AtomicU64,
}

impl std::fmt::Debug for PredictionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionService")
            .field("config", &self.config)
            .field("is_loaded", &self.is_loaded())
            .finish()
    }
}

impl PredictionService {
    pub fn new(config: InferenceConfig) -> Self {
        let store = ArtifactStore::new(&config.artifact_dir);
        Self {
            config,
            schema: FeatureSchema::maintenance(),
            store,
            loaded: RwLock::new(None),
            total_predictions: AtomicU64::new(0),
            rejected_inputs: AtomicU64::new(0),
            unseen_levels: AtomicU64::new(0),
        }
    }

    pub fn with_schema(mut self, schema: FeatureSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.read().is_some()
    }

    /// Loaded pair, reading it from disk on first use
    pub fn artifacts(&self) -> Result<Arc<ArtifactPair>> {
        if let Some(pair) = self.loaded.read().as_ref() {
            return Ok(Arc::clone(pair));
        }

        let mut slot = self.loaded.write();
        // Another caller may have loaded it while we waited
        if let Some(pair) = slot.as_ref() {
            return Ok(Arc::clone(pair));
        }
        let pair = Arc::new(self.store.load()?);
        info!(
            dir = %self.store.dir().display(),
            model = %pair.metadata.name,
            "Artifacts loaded for serving"
        );
        *slot = Some(Arc::clone(&pair));
        Ok(pair)
    }

    /// Drop the cached pair and read the current one from disk
    pub fn reload(&self) -> Result<Arc<ArtifactPair>> {
        let pair = Arc::new(self.store.load()?);
        *self.loaded.write() = Some(Arc::clone(&pair));
        info!(model = %pair.metadata.name, "Artifacts reloaded");
        Ok(pair)
    }

    /// Predict the cost of one maintenance event.
    ///
    /// The record is validated before any artifact is touched, and the result
    /// is never below the configured minimum.
    pub fn predict(&self, record: &MaintenanceRecord) -> Result<f64> {
        if let Err(e) = self.schema.validate(record) {
            self.rejected_inputs.fetch_add(1, Ordering::Relaxed);
            return Err(e);
        }

        let pair = self.artifacts()?;
        self.note_unseen(&pair, record);

        let features = pair.preprocessor.transform_record(record)?;
        let raw = pair.model.predict_one(features.view())?;
        self.total_predictions.fetch_add(1, Ordering::Relaxed);

        let cost = raw.max(self.config.min_prediction);
        debug!(raw, cost, "Prediction");
        Ok(cost)
    }

    /// Parse a raw request and predict
    pub fn predict_request(&self, request: &PredictionRequest) -> Result<f64> {
        let record = match request.parse() {
            Ok(record) => record,
            Err(e) => {
                self.rejected_inputs.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };
        self.predict(&record)
    }

    /// Predict many records in parallel; output order follows input order
    pub fn predict_batch(&self, records: &[MaintenanceRecord]) -> Result<Vec<f64>> {
        // Load once up front so workers only take the read lock
        self.artifacts()?;
        records.par_iter().map(|r| self.predict(r)).collect()
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            total_predictions: self.total_predictions.load(Ordering::Relaxed),
            rejected_inputs: self.rejected_inputs.load(Ordering::Relaxed),
            unseen_levels: self.unseen_levels.load(Ordering::Relaxed),
        }
    }

    fn note_unseen(&self, pair: &ArtifactPair, record: &MaintenanceRecord) {
        let unseen = pair.preprocessor.unseen_levels(record);
        if unseen.is_empty() {
            return;
        }
        self.unseen_levels.fetch_add(unseen.len() as u64, Ordering::Relaxed);
        if self.config.warn_on_unseen_category {
            for (column, level) in &unseen {
                warn!(column = %column, level = %level, "Level unseen during training, encoded as zeros");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CostError;
    use tempfile::tempdir;

    #[test]
    fn test_missing_artifacts() {
        let dir = tempdir().unwrap();
        let service = PredictionService::new(InferenceConfig::new().with_artifact_dir(dir.path()));
        let record = MaintenanceRecord::new(5.0, 5000.0, "Routine", 100, 0, 10.0);

        assert!(matches!(
            service.predict(&record),
            Err(CostError::ArtifactMissing { .. })
        ));
        assert!(!service.is_loaded());
    }

    #[test]
    fn test_validation_runs_before_loading() {
        let dir = tempdir().unwrap();
        let service = PredictionService::new(InferenceConfig::new().with_artifact_dir(dir.path()));
        let record = MaintenanceRecord::new(51.0, 5000.0, "Routine", 100, 0, 10.0);

        match service.predict(&record) {
            Err(CostError::ValidationError { field, .. }) => assert_eq!(field, "Age"),
            other => panic!("expected ValidationError, got {:?}", other),
        }
        assert_eq!(service.stats().rejected_inputs, 1);
    }
}
