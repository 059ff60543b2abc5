//! Serving
//!
//! Loads the persisted preprocessor and model once and scores single
//! maintenance events against them. Concurrent callers share the loaded pair.

mod config;
mod engine;

pub use config::InferenceConfig;
pub use engine::{PredictionService, ServiceStats};
