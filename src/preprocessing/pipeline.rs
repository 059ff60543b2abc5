//! Fitted preprocessing artifact

use crate::error::{CostError, Result};
use crate::schema::{FeatureSchema, MaintenanceRecord};
use super::{
    encoder::{OneHotEncoder, Vocabulary},
    level_values, numeric_values,
    scaler::{ScalerParams, StandardScaler},
};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Bumped whenever the order or meaning of output features changes
pub const FEATURE_LAYOUT_VERSION: u32 = 1;

/// Ordered output feature names plus the layout version that produced them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLayout {
    pub version: u32,
    pub feature_names: Vec<String>,
}

/// Scales numeric columns and one-hot encodes categorical columns.
///
/// Output layout: numeric columns in schema order, then one indicator block
/// per categorical column in schema order, each block in sorted level order.
/// Parameters are frozen by `fit`; a fitted preprocessor refuses to refit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preprocessor {
    layout_version: u32,
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    scaler: StandardScaler,
    encoder: OneHotEncoder,
    feature_names: Vec<String>,
    n_samples_seen: usize,
    fitted_at: Option<DateTime<Utc>>,
    is_fitted: bool,
    /// Seconds spent in fit
    fit_time: Option<f64>,
}

impl Preprocessor {
    /// Create an unfitted preprocessor for the schema's column roles
    pub fn new(schema: &FeatureSchema) -> Self {
        Self {
            layout_version: FEATURE_LAYOUT_VERSION,
            numeric_columns: schema.numeric_columns(),
            categorical_columns: schema.categorical_columns(),
            scaler: StandardScaler::new(),
            encoder: OneHotEncoder::new(),
            feature_names: Vec::new(),
            n_samples_seen: 0,
            fitted_at: None,
            is_fitted: false,
            fit_time: None,
        }
    }

    /// Learn scaling statistics and vocabularies from the training table
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        if self.is_fitted {
            return Err(CostError::AlreadyFitted("Preprocessor".to_string()));
        }
        let start = Instant::now();

        self.check_columns(df)?;
        if df.height() == 0 {
            return Err(CostError::SchemaError(
                "cannot fit preprocessor on an empty table".to_string(),
            ));
        }

        let mut scaler = StandardScaler::new();
        scaler.fit(df, &self.numeric_columns)?;
        let mut encoder = OneHotEncoder::new();
        encoder.fit(df, &self.categorical_columns)?;

        let mut feature_names = self.numeric_columns.clone();
        for vocab in encoder.vocabularies() {
            feature_names.extend(vocab.feature_names());
        }

        self.scaler = scaler;
        self.encoder = encoder;
        self.feature_names = feature_names;
        self.n_samples_seen = df.height();
        self.fitted_at = Some(Utc::now());
        self.is_fitted = true;
        self.fit_time = Some(start.elapsed().as_secs_f64());

        info!(
            rows = self.n_samples_seen,
            features = self.feature_names.len(),
            "Preprocessor fitted"
        );
        Ok(self)
    }

    /// Transform a table into an `(n_rows, n_features)` matrix
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        self.ensure_fitted()?;
        self.check_columns(df)?;

        let numeric: Vec<Vec<f64>> = self
            .numeric_columns
            .iter()
            .map(|c| numeric_values(df, c))
            .collect::<Result<_>>()?;
        let levels: Vec<Vec<String>> = self
            .categorical_columns
            .iter()
            .map(|c| level_values(df, c))
            .collect::<Result<_>>()?;

        let n_rows = df.height();
        let width = self.n_features();
        let mut data = vec![0.0; n_rows * width];

        if width > 0 {
            data.par_chunks_mut(width).enumerate().for_each(|(i, row)| {
                let nums: Vec<f64> = numeric.iter().map(|col| col[i]).collect();
                let lvls: Vec<&str> = levels.iter().map(|col| col[i].as_str()).collect();
                self.encode_row(&nums, &lvls, row);
            });
        }

        debug!(rows = n_rows, width, "Transformed table");
        Ok(Array2::from_shape_vec((n_rows, width), data)?)
    }

    /// Transform a single record into a feature vector.
    ///
    /// Goes through the same row encoder as [`transform`](Self::transform),
    /// so a record and its table row produce identical vectors.
    pub fn transform_record(&self, record: &MaintenanceRecord) -> Result<Array1<f64>> {
        self.ensure_fitted()?;

        let nums: Vec<f64> = self
            .numeric_columns
            .iter()
            .map(|c| {
                record.numeric(c).ok_or_else(|| {
                    CostError::SchemaError(format!("record has no numeric field '{}'", c))
                })
            })
            .collect::<Result<_>>()?;
        let owned_levels: Vec<String> = self
            .categorical_columns
            .iter()
            .map(|c| {
                record.level(c).ok_or_else(|| {
                    CostError::SchemaError(format!("record has no categorical field '{}'", c))
                })
            })
            .collect::<Result<_>>()?;
        let lvls: Vec<&str> = owned_levels.iter().map(String::as_str).collect();

        let mut row = vec![0.0; self.n_features()];
        self.encode_row(&nums, &lvls, &mut row);
        Ok(Array1::from_vec(row))
    }

    /// Fit on a table, then transform it
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<Array2<f64>> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Categorical levels in `record` that were not seen during fit
    pub fn unseen_levels(&self, record: &MaintenanceRecord) -> Vec<(String, String)> {
        self.encoder
            .vocabularies()
            .iter()
            .filter_map(|vocab| {
                let level = record.level(&vocab.column)?;
                match vocab.index_of(&level) {
                    Some(_) => None,
                    None => Some((vocab.column.clone(), level)),
                }
            })
            .collect()
    }

    fn encode_row(&self, numeric: &[f64], levels: &[&str], out: &mut [f64]) {
        let n_numeric = self.scaler.n_features();
        for ((slot, params), value) in out[..n_numeric]
            .iter_mut()
            .zip(self.scaler.params())
            .zip(numeric)
        {
            *slot = params.scale(*value);
        }

        let mut offset = n_numeric;
        for (vocab, level) in self.encoder.vocabularies().iter().zip(levels) {
            let end = offset + vocab.len();
            vocab.encode_into(level, &mut out[offset..end]);
            offset = end;
        }
    }

    fn check_columns(&self, df: &DataFrame) -> Result<()> {
        let missing: Vec<&str> = self
            .numeric_columns
            .iter()
            .chain(&self.categorical_columns)
            .map(String::as_str)
            .filter(|c| df.column(c).is_err())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CostError::SchemaError(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )))
        }
    }

    fn ensure_fitted(&self) -> Result<()> {
        if self.is_fitted {
            Ok(())
        } else {
            Err(CostError::NotFitted("Preprocessor".to_string()))
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn layout(&self) -> FeatureLayout {
        FeatureLayout {
            version: self.layout_version,
            feature_names: self.feature_names.clone(),
        }
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical_columns
    }

    pub fn scaler_params(&self) -> &[ScalerParams] {
        self.scaler.params()
    }

    pub fn vocabularies(&self) -> &[Vocabulary] {
        self.encoder.vocabularies()
    }

    pub fn n_samples_seen(&self) -> usize {
        self.n_samples_seen
    }

    pub fn fitted_at(&self) -> Option<DateTime<Utc>> {
        self.fitted_at
    }

    pub fn fit_time(&self) -> Option<f64> {
        self.fit_time
    }

    /// Save the fitted preprocessor as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a preprocessor saved with [`save`](Self::save)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let preprocessor: Self = serde_json::from_str(&json)?;
        Ok(preprocessor)
    }
}
