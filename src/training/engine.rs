//! Candidate regressors behind a single serializable type

use crate::error::{CostError, Result};
use super::config::{CandidateKind, TrainingConfig};
use super::decision_tree::DecisionTree;
use super::gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
use super::linear_models::LinearRegression;
use super::models::Regressor;
use super::random_forest::{MaxFeatures, RandomForest};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Enum holding one candidate regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    RandomForest(RandomForest),
    GradientBoosting(GradientBoostingRegressor),
    LinearRegression(LinearRegression),
    DecisionTree(DecisionTree),
}

impl TrainedModel {
    /// Build an unfitted candidate with its fixed hyperparameters
    pub fn untrained(kind: CandidateKind, config: &TrainingConfig) -> Self {
        let seed = config.random_state;
        match kind {
            CandidateKind::RandomForest => TrainedModel::RandomForest(
                RandomForest::new(config.n_estimators)
                    .with_max_features(MaxFeatures::All)
                    .with_bootstrap(true)
                    .with_random_state(seed),
            ),
            CandidateKind::GradientBoosting => {
                let gb = GradientBoostingConfig::default()
                    .with_n_estimators(config.n_estimators)
                    .with_random_state(seed);
                TrainedModel::GradientBoosting(GradientBoostingRegressor::new(gb))
            }
            CandidateKind::LinearRegression => {
                TrainedModel::LinearRegression(LinearRegression::new())
            }
            CandidateKind::DecisionTree => {
                TrainedModel::DecisionTree(DecisionTree::new().with_random_state(seed))
            }
        }
    }

    pub fn kind(&self) -> CandidateKind {
        match self {
            TrainedModel::RandomForest(_) => CandidateKind::RandomForest,
            TrainedModel::GradientBoosting(_) => CandidateKind::GradientBoosting,
            TrainedModel::LinearRegression(_) => CandidateKind::LinearRegression,
            TrainedModel::DecisionTree(_) => CandidateKind::DecisionTree,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().display_name()
    }

    fn as_regressor(&self) -> &dyn Regressor {
        match self {
            TrainedModel::RandomForest(m) => m,
            TrainedModel::GradientBoosting(m) => m,
            TrainedModel::LinearRegression(m) => m,
            TrainedModel::DecisionTree(m) => m,
        }
    }

    fn as_regressor_mut(&mut self) -> &mut dyn Regressor {
        match self {
            TrainedModel::RandomForest(m) => m,
            TrainedModel::GradientBoosting(m) => m,
            TrainedModel::LinearRegression(m) => m,
            TrainedModel::DecisionTree(m) => m,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.as_regressor_mut().fit(x, y)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.as_regressor().predict(x)
    }

    /// Predict a single transformed feature vector
    pub fn predict_one(&self, row: ArrayView1<f64>) -> Result<f64> {
        let x = row.insert_axis(Axis(0)).to_owned();
        let y = self.predict(&x)?;
        y.first().copied().ok_or_else(|| CostError::ShapeError {
            expected: "1 prediction".to_string(),
            actual: "0 predictions".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_untrained_candidates_match_kind() {
        let config = TrainingConfig::default().with_n_estimators(5);
        for kind in CandidateKind::ALL {
            let model = TrainedModel::untrained(kind, &config);
            assert_eq!(model.kind(), kind);
        }
    }

    #[test]
    fn test_predict_one_agrees_with_batch() {
        let x = array![[1.0, 0.0], [2.0, 1.0], [3.0, 0.0], [4.0, 1.0], [5.0, 0.0]];
        let y = array![3.0, 6.0, 7.0, 10.0, 11.0];
        let config = TrainingConfig::default().with_n_estimators(5);

        for kind in CandidateKind::ALL {
            let mut model = TrainedModel::untrained(kind, &config);
            model.fit(&x, &y).unwrap();
            let batch = model.predict(&x).unwrap();
            for (i, row) in x.rows().into_iter().enumerate() {
                let one = model.predict_one(row).unwrap();
                assert!((one - batch[i]).abs() < 1e-9, "{}", kind);
            }
        }
    }

    #[test]
    fn test_serde_round_trip_preserves_predictions() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![2.0, 4.0, 5.0, 9.0];
        let mut model = TrainedModel::untrained(CandidateKind::GradientBoosting, &TrainingConfig::default().with_n_estimators(10));
        model.fit(&x, &y).unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let restored: TrainedModel = serde_json::from_str(&json).unwrap();
        assert_eq!(model.predict(&x).unwrap(), restored.predict(&x).unwrap());
    }
}
