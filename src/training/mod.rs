//! Model training
//!
//! Provides the candidate regressors and the selector that picks between them:
//! - Decision trees and random forests
//! - Gradient boosted trees
//! - Ordinary least squares
//! - Test-set scoring and best-model selection

mod config;
mod engine;
mod models;
mod selector;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod linear_models;
pub mod random_forest;

pub use config::{CandidateKind, TrainingConfig};
pub use decision_tree::{DecisionTree, TreeNode};
pub use engine::TrainedModel;
pub use gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
pub use linear_models::LinearRegression;
pub use models::{ModelMetrics, Regressor};
pub use random_forest::{MaxFeatures, RandomForest};
pub use selector::{select_best, CandidateScore, ModelSelector, SelectionReport};
