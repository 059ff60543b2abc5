//! Integration test: generate, train, persist and predict

use maintenance_cost::config::{AppConfig, PathsConfig};
use maintenance_cost::error::CostError;
use maintenance_cost::export::ArtifactStore;
use maintenance_cost::inference::PredictionService;
use maintenance_cost::pipeline::{PipelineStage, TrainingPipeline};
use maintenance_cost::schema::{MaintenanceRecord, MAINTENANCE_COST};
use maintenance_cost::synthetic::{GeneratorConfig, MaintenanceDataGenerator};
use maintenance_cost::training::TrainingConfig;
use maintenance_cost::utils::DataSaver;
use std::path::Path;

fn config_under(root: &Path) -> AppConfig {
    let mut config = AppConfig::default().with_paths(PathsConfig::under(root));
    config.generator = GeneratorConfig::default().with_n_samples(400);
    config.training = TrainingConfig::default().with_n_estimators(20);
    config
}

fn run_end_to_end(root: &Path) -> (String, f64) {
    let config = config_under(root);
    MaintenanceDataGenerator::new(config.generator.clone())
        .write_csv(&config.paths.raw_data)
        .unwrap();

    let mut pipeline = TrainingPipeline::from_config(&config);
    let outcome = pipeline.run().unwrap();
    assert_eq!(pipeline.state(), PipelineStage::Done);

    let service = PredictionService::new(config.inference.clone());
    let record = MaintenanceRecord::new(5.0, 5000.0, "Routine", 100, 0, 10.0);
    let first = service.predict(&record).unwrap();
    let second = service.predict(&record).unwrap();
    assert_eq!(first, second);
    assert!(first >= 100.0);

    (outcome.metadata.name, first)
}

#[test]
fn test_end_to_end_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let (winner, cost) = run_end_to_end(dir.path());
    assert!(!winner.is_empty());
    // Noise-free Routine cost for this record is 670
    assert!(cost > 300.0 && cost < 1100.0, "cost {}", cost);
}

#[test]
fn test_runs_are_reproducible() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    assert_eq!(run_end_to_end(a.path()), run_end_to_end(b.path()));
}

#[test]
fn test_artifacts_carry_layout_and_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_under(dir.path());
    MaintenanceDataGenerator::new(config.generator.clone())
        .write_csv(&config.paths.raw_data)
        .unwrap();
    let outcome = TrainingPipeline::from_config(&config).run().unwrap();

    let pair = ArtifactStore::new(&config.paths.artifact_dir).load().unwrap();
    assert_eq!(pair.metadata.feature_layout, pair.preprocessor.layout());
    assert_eq!(pair.metadata.feature_layout.feature_names.len(), 9);
    assert_eq!(pair.metadata.target_name, MAINTENANCE_COST);
    assert_eq!(pair.metadata.test_metrics, outcome.report.winner_score().test);
    assert_eq!(pair.model.kind(), outcome.report.winner.kind());
}

#[test]
fn test_missing_column_fails_at_ingestion() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_under(dir.path());
    let mut df = MaintenanceDataGenerator::new(config.generator.clone())
        .generate(100)
        .unwrap()
        .drop("Technician_Experience")
        .unwrap();
    DataSaver::save_csv(&mut df, &config.paths.raw_data).unwrap();

    let mut pipeline = TrainingPipeline::from_config(&config);
    let err = pipeline.run().unwrap_err();

    assert_eq!(err.stage(), Some(PipelineStage::Ingesting));
    match err.root() {
        CostError::SchemaError(msg) => assert!(msg.contains("Technician_Experience")),
        other => panic!("expected SchemaError, got {:?}", other),
    }
    assert_eq!(pipeline.state(), PipelineStage::Failed);
    assert!(!ArtifactStore::new(&config.paths.artifact_dir).exists());
}

#[test]
fn test_failed_run_keeps_previous_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_under(dir.path());
    MaintenanceDataGenerator::new(config.generator.clone())
        .write_csv(&config.paths.raw_data)
        .unwrap();
    TrainingPipeline::from_config(&config).run().unwrap();
    let before = ArtifactStore::new(&config.paths.artifact_dir).load().unwrap();

    // Corrupt the raw table, then retrain
    std::fs::write(&config.paths.raw_data, "Machine_ID,Age\nM_0000,3.0\n").unwrap();
    assert!(TrainingPipeline::from_config(&config).run().is_err());

    let after = ArtifactStore::new(&config.paths.artifact_dir).load().unwrap();
    assert_eq!(after.metadata, before.metadata);
}

#[test]
fn test_failed_persist_keeps_previous_preprocessor() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_under(dir.path());
    MaintenanceDataGenerator::new(config.generator.clone())
        .write_csv(&config.paths.raw_data)
        .unwrap();
    TrainingPipeline::from_config(&config).run().unwrap();
    let store = ArtifactStore::new(&config.paths.artifact_dir);
    let pre_before = std::fs::read_to_string(store.preprocessor_path()).unwrap();

    // New data would change the scaler; block the model file so persisting fails
    MaintenanceDataGenerator::new(config.generator.clone().with_seed(9))
        .write_csv(&config.paths.raw_data)
        .unwrap();
    std::fs::remove_file(store.model_path()).unwrap();
    std::fs::create_dir(store.model_path()).unwrap();

    let mut pipeline = TrainingPipeline::from_config(&config);
    let err = pipeline.run().unwrap_err();
    assert_eq!(err.stage(), Some(PipelineStage::Persisting));
    assert_eq!(pipeline.state(), PipelineStage::Failed);

    let pre_after = std::fs::read_to_string(store.preprocessor_path()).unwrap();
    assert_eq!(pre_before, pre_after);
    let leftovers: Vec<String> = std::fs::read_dir(store.dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".tmp") || name.ends_with(".bak"))
        .collect();
    assert!(leftovers.is_empty(), "{:?}", leftovers);
}
