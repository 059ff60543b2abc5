//! Integration test: candidate regressors and model selection

use maintenance_cost::error::CostError;
use maintenance_cost::preprocessing::Preprocessor;
use maintenance_cost::schema::{FeatureSchema, MAINTENANCE_COST};
use maintenance_cost::synthetic::{GeneratorConfig, MaintenanceDataGenerator};
use maintenance_cost::training::{
    select_best, CandidateKind, DecisionTree, GradientBoostingConfig, GradientBoostingRegressor,
    LinearRegression, ModelMetrics, ModelSelector, RandomForest, TrainedModel,
    TrainingConfig,
};
use ndarray::{Array1, Array2};

struct Split {
    x_train: Array2<f64>,
    y_train: Array1<f64>,
    x_test: Array2<f64>,
    y_test: Array1<f64>,
}

fn target(df: &polars::prelude::DataFrame) -> Array1<f64> {
    df.column(MAINTENANCE_COST)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect()
}

fn maintenance_split() -> Split {
    let df = MaintenanceDataGenerator::new(GeneratorConfig::default())
        .generate(400)
        .unwrap();
    let train = df.slice(0, 320);
    let test = df.slice(320, 80);

    let mut pre = Preprocessor::new(&FeatureSchema::maintenance());
    let x_train = pre.fit_transform(&train).unwrap();
    let x_test = pre.transform(&test).unwrap();
    Split {
        x_train,
        y_train: target(&train),
        x_test,
        y_test: target(&test),
    }
}

fn fast_config() -> TrainingConfig {
    TrainingConfig::default().with_n_estimators(20)
}

#[test]
fn test_selection_rule() {
    assert_eq!(select_best(&[0.9, 0.85, 0.7, 0.6]), Some(0));
    assert_eq!(select_best(&[0.6, 0.7, 0.85, 0.9]), Some(3));
    assert_eq!(select_best(&[0.8, 0.85, 0.85, 0.1]), Some(1));
}

#[test]
fn test_every_candidate_learns_the_cost() {
    let split = maintenance_split();
    for kind in CandidateKind::ALL {
        let mut model = TrainedModel::untrained(kind, &fast_config());
        model.fit(&split.x_train, &split.y_train).unwrap();
        let pred = model.predict(&split.x_test).unwrap();
        let metrics = ModelMetrics::compute_regression(&split.y_test, &pred);
        assert!(metrics.is_finite(), "{} produced {:?}", kind, metrics);
        assert!(metrics.r2 > 0.5, "{} test R² {}", kind, metrics.r2);
    }
}

#[test]
fn test_selector_report() {
    let split = maintenance_split();
    let report = ModelSelector::new(fast_config())
        .run_configured(&split.x_train, &split.y_train, &split.x_test, &split.y_test)
        .unwrap();

    assert_eq!(report.scores.len(), 4);
    let r2s: Vec<f64> = report.scores.iter().map(|s| s.test.r2).collect();
    assert_eq!(Some(report.winner_index), select_best(&r2s));
    assert_eq!(report.winner.kind(), report.winner_score().kind);
    assert_eq!(report.winner_test_predictions.len(), split.y_test.len());
    assert!(report.winner_score().test.r2 > 0.6);
    assert!(!report.low_confidence);

    let again = report.winner.predict(&split.x_test).unwrap();
    assert_eq!(again.to_vec(), report.winner_test_predictions);
}

#[test]
fn test_selector_is_repeatable() {
    let split = maintenance_split();
    let selector = ModelSelector::new(fast_config());
    let a = selector
        .run_configured(&split.x_train, &split.y_train, &split.x_test, &split.y_test)
        .unwrap();
    let b = selector
        .run_configured(&split.x_train, &split.y_train, &split.x_test, &split.y_test)
        .unwrap();

    let metrics = |r: &maintenance_cost::training::SelectionReport| -> Vec<ModelMetrics> {
        r.scores.iter().map(|s| s.test.clone()).collect()
    };
    assert_eq!(metrics(&a), metrics(&b));
    assert_eq!(a.winner_test_predictions, b.winner_test_predictions);
}

#[test]
fn test_low_r2_is_only_a_warning() {
    let split = maintenance_split();
    let report = ModelSelector::new(
        fast_config()
            .with_min_r2(0.9999)
            .with_candidates(vec![CandidateKind::LinearRegression]),
    )
    .run_configured(&split.x_train, &split.y_train, &split.x_test, &split.y_test)
    .unwrap();
    assert!(report.low_confidence);
    assert!(report.summary().contains("low confidence"));
}

#[test]
fn test_failing_candidate_is_named() {
    let split = maintenance_split();
    let mut y_train = split.y_train.clone();
    y_train[0] = f64::NAN;

    let result = ModelSelector::new(fast_config().with_candidates(vec![CandidateKind::LinearRegression]))
        .run_configured(&split.x_train, &y_train, &split.x_test, &split.y_test);
    match result {
        Err(CostError::TrainingError { candidate, .. }) => assert_eq!(candidate, "Linear Regression"),
        other => panic!("expected TrainingError, got {:?}", other.map(|r| r.winner_index)),
    }
}

#[test]
fn test_forest_seed_controls_output() {
    let split = maintenance_split();
    let fit = |seed: u64| {
        let mut rf = RandomForest::new(10).with_random_state(seed);
        rf.fit(&split.x_train, &split.y_train).unwrap();
        rf.predict(&split.x_test).unwrap()
    };
    assert_eq!(fit(42), fit(42));
    assert_ne!(fit(42), fit(7));
}

#[test]
fn test_boosting_reduces_training_loss() {
    let split = maintenance_split();
    let mut gb = GradientBoostingRegressor::new(GradientBoostingConfig::default().with_n_estimators(30));
    gb.fit(&split.x_train, &split.y_train).unwrap();
    let loss = gb.train_loss();
    assert!(loss.last().unwrap() < loss.first().unwrap());
}

#[test]
fn test_unfitted_models_refuse_to_predict() {
    let x = Array2::<f64>::zeros((2, 9));
    assert!(matches!(DecisionTree::new().predict(&x), Err(CostError::NotFitted(_))));
    assert!(matches!(LinearRegression::new().predict(&x), Err(CostError::NotFitted(_))));
}
