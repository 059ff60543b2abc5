//! Training configuration

use serde::{Deserialize, Serialize};
use std::fmt;

/// Regressor families evaluated by the selector, in tie-break order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateKind {
    /// Bagged regression trees
    RandomForest,
    /// Boosted shallow regression trees
    GradientBoosting,
    /// Ordinary least squares
    LinearRegression,
    /// Single unpruned regression tree
    DecisionTree,
}

impl CandidateKind {
    /// Fixed evaluation order; earlier candidates win ties
    pub const ALL: [CandidateKind; 4] = [
        CandidateKind::RandomForest,
        CandidateKind::GradientBoosting,
        CandidateKind::LinearRegression,
        CandidateKind::DecisionTree,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            CandidateKind::RandomForest => "Random Forest",
            CandidateKind::GradientBoosting => "Gradient Boosting",
            CandidateKind::LinearRegression => "Linear Regression",
            CandidateKind::DecisionTree => "Decision Tree",
        }
    }

    /// Position in [`CandidateKind::ALL`]
    pub fn rank(&self) -> usize {
        match self {
            CandidateKind::RandomForest => 0,
            CandidateKind::GradientBoosting => 1,
            CandidateKind::LinearRegression => 2,
            CandidateKind::DecisionTree => 3,
        }
    }
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Configuration for a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fraction of rows held out for testing
    pub test_size: f64,

    /// Seed for the split and for every seeded candidate
    pub random_state: u64,

    /// Trees in the forest and stages in the booster
    pub n_estimators: usize,

    /// Winning test R² below this is flagged low-confidence
    pub min_r2: f64,

    /// Refuse to persist a low-confidence winner
    pub block_on_low_confidence: bool,

    /// Candidates to evaluate; always run in [`CandidateKind::ALL`] order
    pub candidates: Vec<CandidateKind>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            random_state: 42,
            n_estimators: 100,
            min_r2: 0.6,
            block_on_low_confidence: false,
            candidates: CandidateKind::ALL.to_vec(),
        }
    }
}

impl TrainingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_min_r2(mut self, min_r2: f64) -> Self {
        self.min_r2 = min_r2;
        self
    }

    pub fn with_block_on_low_confidence(mut self, block: bool) -> Self {
        self.block_on_low_confidence = block;
        self
    }

    pub fn with_candidates(mut self, candidates: Vec<CandidateKind>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Configured candidates, deduplicated and in tie-break order
    pub fn ordered_candidates(&self) -> Vec<CandidateKind> {
        CandidateKind::ALL
            .iter()
            .copied()
            .filter(|k| self.candidates.contains(k))
            .collect()
    }

    /// Check ranges before any work starts
    pub fn validate(&self) -> Result<(), String> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(format!("test_size must be in (0, 1), got {}", self.test_size));
        }
        if self.n_estimators == 0 {
            return Err("n_estimators must be at least 1".to_string());
        }
        if self.ordered_candidates().is_empty() {
            return Err("at least one candidate is required".to_string());
        }
        Ok(())
    }
}
