//! Candidate evaluation and winner selection

use crate::error::{CostError, Result};
use super::config::{CandidateKind, TrainingConfig};
use super::engine::TrainedModel;
use super::models::ModelMetrics;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Instant;
use tracing::{info, warn};

/// Scores for one evaluated candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub kind: CandidateKind,
    pub train_r2: f64,
    /// Metrics on the held-out test rows
    pub test: ModelMetrics,
    pub training_time_secs: f64,
}

impl CandidateScore {
    pub fn name(&self) -> &'static str {
        self.kind.display_name()
    }
}

/// Outcome of a selection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionReport {
    /// One entry per candidate, in evaluation order
    pub scores: Vec<CandidateScore>,
    /// Index into `scores` of the winner
    pub winner_index: usize,
    /// The winning fitted model; losers are dropped
    pub winner: TrainedModel,
    /// Winner's predictions for each test row, in test-row order
    pub winner_test_predictions: Vec<f64>,
    /// Threshold the winner was checked against
    pub min_r2: f64,
    /// Winner's test R² fell below `min_r2`
    pub low_confidence: bool,
}

impl SelectionReport {
    pub fn winner_score(&self) -> &CandidateScore {
        &self.scores[self.winner_index]
    }

    pub fn winner_name(&self) -> &'static str {
        self.winner.name()
    }

    /// Plain-text comparison table
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "  {:<20} {:>9} {:>9} {:>10} {:>10} {:>8}",
            "Model", "Train R2", "Test R2", "MAE", "RMSE", "Time(s)"
        );
        for (i, s) in self.scores.iter().enumerate() {
            let marker = if i == self.winner_index { '*' } else { ' ' };
            let _ = writeln!(
                out,
                "{} {:<20} {:>9.4} {:>9.4} {:>10.2} {:>10.2} {:>8.2}",
                marker,
                s.name(),
                s.train_r2,
                s.test.r2,
                s.test.mae,
                s.test.rmse,
                s.training_time_secs
            );
        }
        let best = self.winner_score();
        let _ = write!(out, "Best model: {} (test R2 = {:.4})", best.name(), best.test.r2);
        if self.low_confidence {
            let _ = write!(out, " [low confidence: below {:.2}]", self.min_r2);
        }
        out
    }
}

/// Index of the highest score; ties keep the earliest, NaN never wins
pub fn select_best(scores: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &score) in scores.iter().enumerate() {
        let score = if score.is_nan() { f64::NEG_INFINITY } else { score };
        match best {
            Some((_, b)) if score <= b => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

/// Fits every candidate on the training rows and keeps the best on test R²
#[derive(Debug, Clone)]
pub struct ModelSelector {
    config: TrainingConfig,
}

impl ModelSelector {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Evaluate the configured candidates
    pub fn run_configured(
        &self,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
    ) -> Result<SelectionReport> {
        let candidates = self.config.ordered_candidates();
        self.run(x_train, y_train, x_test, y_test, &candidates)
    }

    /// Fit each candidate independently and pick the highest test R².
    ///
    /// Candidates are evaluated in [`CandidateKind::ALL`] order regardless of
    /// the order given. Any failing candidate aborts the run.
    pub fn run(
        &self,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
        candidates: &[CandidateKind],
    ) -> Result<SelectionReport> {
        let ordered: Vec<CandidateKind> = CandidateKind::ALL
            .iter()
            .copied()
            .filter(|k| candidates.contains(k))
            .collect();
        let first = match ordered.first() {
            Some(kind) => kind.display_name(),
            None => return Err(CostError::ConfigError("no candidates to evaluate".to_string())),
        };

        // A malformed matrix would fail the first fit; report it against that candidate
        check_matrices(x_train, y_train, x_test, y_test)
            .map_err(|e| CostError::training(first, e.to_string()))?;

        let mut scores = Vec::with_capacity(ordered.len());
        let mut models = Vec::with_capacity(ordered.len());
        let mut test_predictions = Vec::with_capacity(ordered.len());

        for kind in ordered {
            let (model, score, preds) = self.evaluate(kind, x_train, y_train, x_test, y_test)?;
            scores.push(score);
            models.push(model);
            test_predictions.push(preds);
        }

        let r2s: Vec<f64> = scores.iter().map(|s: &CandidateScore| s.test.r2).collect();
        let winner_index = select_best(&r2s)
            .ok_or_else(|| CostError::ConfigError("no candidates to evaluate".to_string()))?;
        let winner = models.swap_remove(winner_index);
        let winner_test_predictions = test_predictions.swap_remove(winner_index).to_vec();

        let best = &scores[winner_index];
        let low_confidence = best.test.r2 < self.config.min_r2;
        info!(
            winner = best.name(),
            test_r2 = best.test.r2,
            mae = best.test.mae,
            rmse = best.test.rmse,
            "Selected best model"
        );
        if low_confidence {
            warn!(
                winner = best.name(),
                test_r2 = best.test.r2,
                threshold = self.config.min_r2,
                "Best model R² is below the quality threshold"
            );
        }

        Ok(SelectionReport {
            scores,
            winner_index,
            winner,
            winner_test_predictions,
            min_r2: self.config.min_r2,
            low_confidence,
        })
    }

    fn evaluate(
        &self,
        kind: CandidateKind,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
    ) -> Result<(TrainedModel, CandidateScore, Array1<f64>)> {
        let name = kind.display_name();
        let start = Instant::now();

        let mut model = TrainedModel::untrained(kind, &self.config);
        model
            .fit(x_train, y_train)
            .map_err(|e| CostError::training(name, e.to_string()))?;
        let training_time_secs = start.elapsed().as_secs_f64();

        let train_pred = model
            .predict(x_train)
            .map_err(|e| CostError::training(name, e.to_string()))?;
        let test_pred = model
            .predict(x_test)
            .map_err(|e| CostError::training(name, e.to_string()))?;

        if test_pred.iter().chain(train_pred.iter()).any(|v| !v.is_finite()) {
            return Err(CostError::training(name, "produced non-finite predictions"));
        }

        let train_r2 = ModelMetrics::compute_regression(y_train, &train_pred).r2;
        let test = ModelMetrics::compute_regression(y_test, &test_pred);

        info!(
            candidate = name,
            train_r2,
            test_r2 = test.r2,
            mae = test.mae,
            rmse = test.rmse,
            secs = training_time_secs,
            "Candidate evaluated"
        );

        let score = CandidateScore {
            kind,
            train_r2,
            test,
            training_time_secs,
        };
        Ok((model, score, test_pred))
    }
}

fn check_matrices(
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    x_test: &Array2<f64>,
    y_test: &Array1<f64>,
) -> Result<()> {
    check_shapes(x_train, y_train, "training")?;
    check_shapes(x_test, y_test, "test")?;
    if x_train.ncols() != x_test.ncols() {
        return Err(CostError::ShapeError {
            expected: format!("{} test features", x_train.ncols()),
            actual: format!("{} test features", x_test.ncols()),
        });
    }
    Ok(())
}

fn check_shapes(x: &Array2<f64>, y: &Array1<f64>, split: &str) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(CostError::ShapeError {
            expected: format!("{} {} targets", x.nrows(), split),
            actual: format!("{} {} targets", y.len(), split),
        });
    }
    if x.nrows() == 0 {
        return Err(CostError::DataError(format!("{} split is empty", split)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_select_best_picks_highest() {
        assert_eq!(select_best(&[0.9, 0.85, 0.7, 0.6]), Some(0));
        assert_eq!(select_best(&[0.5, 0.85, 0.7, 0.6]), Some(1));
    }

    #[test]
    fn test_select_best_ties_go_to_earliest() {
        assert_eq!(select_best(&[0.7, 0.9, 0.9, 0.1]), Some(1));
        assert_eq!(select_best(&[0.8, 0.8, 0.8, 0.8]), Some(0));
    }

    #[test]
    fn test_select_best_ignores_nan() {
        assert_eq!(select_best(&[f64::NAN, 0.2]), Some(1));
        assert_eq!(select_best(&[]), None);
    }

    fn toy_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((60, 2), |(i, j)| ((i * 7 + j * 13) % 23) as f64);
        let y: Array1<f64> = x.rows().into_iter().map(|r| 4.0 * r[0] - 2.0 * r[1] + 10.0).collect();
        (x, y)
    }

    #[test]
    fn test_run_reports_every_candidate() {
        let (x, y) = toy_data();
        let selector = ModelSelector::new(TrainingConfig::default().with_n_estimators(10));
        let report = selector.run_configured(&x, &y, &x, &y).unwrap();

        assert_eq!(report.scores.len(), 4);
        let kinds: Vec<CandidateKind> = report.scores.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, CandidateKind::ALL.to_vec());

        // Exact linear target: OLS fits perfectly
        assert!(report.winner_score().test.r2 > 0.999);
        assert_eq!(report.winner_test_predictions.len(), 60);
        assert!(!report.low_confidence);
        assert!(report.summary().contains("Best model"));
    }

    #[test]
    fn test_low_confidence_flag() {
        let (x, y) = toy_data();
        let selector = ModelSelector::new(
            TrainingConfig::default()
                .with_min_r2(1.5)
                .with_candidates(vec![CandidateKind::LinearRegression]),
        );
        let report = selector.run_configured(&x, &y, &x, &y).unwrap();
        assert!(report.low_confidence);
        assert_eq!(report.winner.kind(), CandidateKind::LinearRegression);
    }

    #[test]
    fn test_malformed_matrix_names_first_candidate() {
        let x = Array2::from_shape_fn((10, 3), |(i, j)| (i + j) as f64);
        let y = Array1::from_vec((0..7).map(|i| i as f64).collect());
        let selector = ModelSelector::new(TrainingConfig::default());

        match selector.run_configured(&x, &y, &x, &y) {
            Err(CostError::TrainingError { candidate, reason }) => {
                assert_eq!(candidate, "Random Forest");
                assert!(reason.contains("7 training targets"), "{}", reason);
            }
            other => panic!("expected TrainingError, got {:?}", other.map(|r| r.winner_index)),
        }

        let linear_only = ModelSelector::new(
            TrainingConfig::default().with_candidates(vec![CandidateKind::LinearRegression]),
        );
        let (x, y) = toy_data();
        let narrow = x.slice(ndarray::s![.., ..1]).to_owned();
        assert!(matches!(
            linear_only.run_configured(&x, &y, &narrow, &y),
            Err(CostError::TrainingError { candidate, .. }) if candidate == "Linear Regression"
        ));
    }
}
