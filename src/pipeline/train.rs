//! Staged training run

use ndarray::{Array1, Array2};
use std::path::PathBuf;
use tracing::{error, info};

use super::ingestion::{DataIngestion, SplitPaths};
use super::PipelineStage;
use crate::config::{AppConfig, PathsConfig};
use crate::error::{CostError, Result};
use crate::export::{ArtifactStore, ModelMetadata};
use crate::preprocessing::{numeric_values, Preprocessor};
use crate::schema::FeatureSchema;
use crate::training::{ModelSelector, SelectionReport, TrainingConfig};
use crate::utils::{DataLoader, Timer};

/// Feature matrices and targets for both sides of the split
#[derive(Debug, Clone)]
pub struct TransformedSplits {
    pub preprocessor: Preprocessor,
    pub x_train: Array2<f64>,
    pub y_train: Array1<f64>,
    pub x_test: Array2<f64>,
    pub y_test: Array1<f64>,
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub split: SplitPaths,
    pub report: SelectionReport,
    pub metadata: ModelMetadata,
    pub artifact_dir: PathBuf,
    pub elapsed_secs: f64,
}

/// Ingest, transform, select and persist
#[derive(Debug)]
pub struct TrainingPipeline {
    schema: FeatureSchema,
    paths: PathsConfig,
    training: TrainingConfig,
    state: PipelineStage,
    failed_at: Option<PipelineStage>,
}

impl TrainingPipeline {
    pub fn new(paths: PathsConfig, training: TrainingConfig) -> Self {
        Self {
            schema: FeatureSchema::maintenance(),
            paths,
            training,
            state: PipelineStage::Pending,
            failed_at: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.paths.clone(), config.training.clone())
    }

    pub fn with_schema(mut self, schema: FeatureSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Current stage
    pub fn state(&self) -> PipelineStage {
        self.state
    }

    /// Stage that failed in the last run, if it failed
    pub fn failed_at(&self) -> Option<PipelineStage> {
        self.failed_at
    }

    pub fn paths(&self) -> &PathsConfig {
        &self.paths
    }

    /// Run every stage to completion.
    ///
    /// The artifact pair is only written in the final stage, so a failure in
    /// any earlier stage leaves the artifact directory untouched.
    pub fn run(&mut self) -> Result<TrainingOutcome> {
        self.failed_at = None;
        let timer = Timer::start();

        // Settings are checked as part of ingestion, before any file is read
        self.enter(PipelineStage::Ingesting);
        let split = self
            .training
            .validate()
            .map_err(CostError::ConfigError)
            .and_then(|_| self.ingest())
            .map_err(|e| self.fail(PipelineStage::Ingesting, e))?;

        self.enter(PipelineStage::Transforming);
        let data = self
            .transform(&split)
            .map_err(|e| self.fail(PipelineStage::Transforming, e))?;

        self.enter(PipelineStage::Training);
        let report = self
            .select(&data)
            .map_err(|e| self.fail(PipelineStage::Training, e))?;

        self.enter(PipelineStage::Persisting);
        let metadata = self
            .persist(&data.preprocessor, &report)
            .map_err(|e| self.fail(PipelineStage::Persisting, e))?;

        self.state = PipelineStage::Done;
        let elapsed_secs = timer.elapsed_secs();
        info!(
            winner = %metadata.name,
            test_r2 = metadata.test_metrics.r2,
            secs = elapsed_secs,
            "Training pipeline finished"
        );

        Ok(TrainingOutcome {
            split,
            report,
            metadata,
            artifact_dir: self.paths.artifact_dir.clone(),
            elapsed_secs,
        })
    }

    fn enter(&mut self, stage: PipelineStage) {
        info!(stage = %stage, "Stage started");
        self.state = stage;
    }

    fn fail(&mut self, stage: PipelineStage, source: CostError) -> CostError {
        error!(stage = %stage, error = %source, "Stage failed");
        self.state = PipelineStage::Failed;
        self.failed_at = Some(stage);
        CostError::StageFailed {
            stage,
            source: Box::new(source),
        }
    }

    fn ingest(&self) -> Result<SplitPaths> {
        DataIngestion::new(
            self.schema.clone(),
            self.training.test_size,
            self.training.random_state,
        )
        .run(&self.paths.raw_data, &self.paths.split_dir)
    }

    fn transform(&self, split: &SplitPaths) -> Result<TransformedSplits> {
        let loader = DataLoader::new();
        let train = loader.load_csv(&split.train)?;
        let test = loader.load_csv(&split.test)?;
        self.schema.check_table(&train, true)?;
        self.schema.check_table(&test, true)?;

        let mut preprocessor = Preprocessor::new(&self.schema);
        let x_train = preprocessor.fit_transform(&train)?;
        let x_test = preprocessor.transform(&test)?;

        let target = &self.schema.target.name;
        let y_train = Array1::from_vec(numeric_values(&train, target)?);
        let y_test = Array1::from_vec(numeric_values(&test, target)?);

        info!(
            train_rows = x_train.nrows(),
            test_rows = x_test.nrows(),
            features = x_train.ncols(),
            "Features prepared"
        );
        Ok(TransformedSplits {
            preprocessor,
            x_train,
            y_train,
            x_test,
            y_test,
        })
    }

    fn select(&self, data: &TransformedSplits) -> Result<SelectionReport> {
        let report = ModelSelector::new(self.training.clone()).run_configured(
            &data.x_train,
            &data.y_train,
            &data.x_test,
            &data.y_test,
        )?;

        if report.low_confidence && self.training.block_on_low_confidence {
            let best = report.winner_score();
            return Err(CostError::training(
                best.name(),
                format!(
                    "test R² {:.4} is below the required {:.2}",
                    best.test.r2, self.training.min_r2
                ),
            ));
        }
        Ok(report)
    }

    fn persist(&self, preprocessor: &Preprocessor, report: &SelectionReport) -> Result<ModelMetadata> {
        let metadata = ModelMetadata::from_report(report, preprocessor, self.schema.target.name.clone());
        ArtifactStore::new(&self.paths.artifact_dir).save(preprocessor, &report.winner, &metadata)?;
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{GeneratorConfig, MaintenanceDataGenerator};
    use crate::training::CandidateKind;
    use tempfile::tempdir;

    fn fast_config() -> TrainingConfig {
        TrainingConfig::default()
            .with_n_estimators(5)
            .with_candidates(vec![CandidateKind::LinearRegression, CandidateKind::DecisionTree])
    }

    #[test]
    fn test_run_reaches_done() {
        let dir = tempdir().unwrap();
        let paths = PathsConfig::under(dir.path());
        MaintenanceDataGenerator::new(GeneratorConfig::default().with_n_samples(120))
            .write_csv(&paths.raw_data)
            .unwrap();

        let mut pipeline = TrainingPipeline::new(paths.clone(), fast_config());
        assert_eq!(pipeline.state(), PipelineStage::Pending);

        let outcome = pipeline.run().unwrap();
        assert_eq!(pipeline.state(), PipelineStage::Done);
        assert_eq!(pipeline.failed_at(), None);
        assert_eq!(outcome.report.scores.len(), 2);
        assert!(ArtifactStore::new(&paths.artifact_dir).exists());
    }

    #[test]
    fn test_invalid_settings_fail_the_run() {
        let dir = tempdir().unwrap();
        let paths = PathsConfig::under(dir.path());
        let mut pipeline = TrainingPipeline::new(paths.clone(), fast_config().with_test_size(1.5));

        let err = pipeline.run().unwrap_err();
        assert_eq!(err.stage(), Some(PipelineStage::Ingesting));
        assert!(matches!(err.root(), CostError::ConfigError(_)));
        assert_eq!(pipeline.state(), PipelineStage::Failed);
        assert_eq!(pipeline.failed_at(), Some(PipelineStage::Ingesting));
    }

    #[test]
    fn test_missing_raw_data_fails_in_ingestion() {
        let dir = tempdir().unwrap();
        let paths = PathsConfig::under(dir.path());
        let mut pipeline = TrainingPipeline::new(paths.clone(), fast_config());

        let err = pipeline.run().unwrap_err();
        assert_eq!(err.stage(), Some(PipelineStage::Ingesting));
        assert_eq!(pipeline.state(), PipelineStage::Failed);
        assert_eq!(pipeline.failed_at(), Some(PipelineStage::Ingesting));
        assert!(!paths.artifact_dir.exists());
    }

    #[test]
    fn test_blocking_gate_prevents_persisting() {
        let dir = tempdir().unwrap();
        let paths = PathsConfig::under(dir.path());
        MaintenanceDataGenerator::new(GeneratorConfig::default().with_n_samples(80))
            .write_csv(&paths.raw_data)
            .unwrap();

        let config = fast_config()
            .with_min_r2(0.9999)
            .with_block_on_low_confidence(true);
        let mut pipeline = TrainingPipeline::new(paths.clone(), config);

        let err = pipeline.run().unwrap_err();
        assert_eq!(err.stage(), Some(PipelineStage::Training));
        assert!(matches!(err.root(), CostError::TrainingError { .. }));
        assert!(!ArtifactStore::new(&paths.artifact_dir).exists());
    }
}
