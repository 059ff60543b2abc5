//! Standard (z-score) scaling for numeric columns

use crate::error::{CostError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::numeric_values;

/// Frozen statistics for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub column: String,
    pub mean: f64,
    /// Population standard deviation (ddof = 0)
    pub std: f64,
}

impl ScalerParams {
    /// `(value - mean) / std`, or 0 for a constant column
    #[inline]
    pub fn scale(&self, value: f64) -> f64 {
        if self.std == 0.0 {
            0.0
        } else {
            (value - self.mean) / self.std
        }
    }
}

/// Z-score scaler over an ordered list of columns
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn mean and population std for each column, in the given order
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        let mut params = Vec::with_capacity(columns.len());
        for column in columns {
            let values = numeric_values(df, column)?;
            if values.is_empty() {
                return Err(CostError::SchemaError(format!(
                    "column '{}' has no rows to fit on",
                    column
                )));
            }
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            params.push(ScalerParams {
                column: column.clone(),
                mean,
                std: var.sqrt(),
            });
        }

        self.params = params;
        self.is_fitted = true;
        Ok(self)
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn params(&self) -> &[ScalerParams] {
        &self.params
    }

    pub fn n_features(&self) -> usize {
        self.params.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_population_statistics() {
        let df = df!("a" => &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let mut scaler = StandardScaler::new();
        scaler.fit(&df, &["a".to_string()]).unwrap();

        let p = &scaler.params()[0];
        assert!((p.mean - 3.0).abs() < 1e-12);
        assert!((p.std - 2.0f64.sqrt()).abs() < 1e-12);
        assert!((p.scale(3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_scales_to_zero() {
        let df = df!("a" => &[7.0, 7.0, 7.0]).unwrap();
        let mut scaler = StandardScaler::new();
        scaler.fit(&df, &["a".to_string()]).unwrap();

        let p = &scaler.params()[0];
        assert_eq!(p.std, 0.0);
        assert_eq!(p.scale(7.0), 0.0);
        assert_eq!(p.scale(1000.0), 0.0);
    }

    #[test]
    fn test_integer_columns_are_accepted() {
        let df = df!("days" => &[10i64, 20, 30]).unwrap();
        let mut scaler = StandardScaler::new();
        scaler.fit(&df, &["days".to_string()]).unwrap();
        assert!((scaler.params()[0].mean - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_text_column_is_schema_error() {
        let df = df!("a" => &["x", "y"]).unwrap();
        let mut scaler = StandardScaler::new();
        let err = scaler.fit(&df, &["a".to_string()]).unwrap_err();
        assert!(matches!(err, CostError::SchemaError(_)));
    }
}
