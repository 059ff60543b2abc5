//! Feature preprocessing
//!
//! Turns raw maintenance records into the numeric feature matrix the
//! regressors consume:
//! - z-score scaling of numeric columns
//! - one-of-k encoding of categorical columns (unknown levels encode to zeros)
//! - a fixed, versioned output layout recorded in the fitted artifact

mod encoder;
mod pipeline;
mod scaler;

pub use encoder::{OneHotEncoder, Vocabulary};
pub use pipeline::{FeatureLayout, Preprocessor, FEATURE_LAYOUT_VERSION};
pub use scaler::{ScalerParams, StandardScaler};

use crate::error::{CostError, Result};
use polars::prelude::*;

/// Read a column as dense f64 values.
///
/// Integer and boolean columns are widened; text columns and columns with
/// missing values are rejected.
pub(crate) fn numeric_values(df: &DataFrame, column: &str) -> Result<Vec<f64>> {
    let col = df
        .column(column)
        .map_err(|_| CostError::SchemaError(format!("missing required column '{}'", column)))?;

    if matches!(col.dtype(), DataType::String) {
        return Err(CostError::SchemaError(format!(
            "column '{}' must be numeric, found text",
            column
        )));
    }
    if col.null_count() > 0 {
        return Err(CostError::SchemaError(format!(
            "column '{}' has {} missing value(s)",
            column,
            col.null_count()
        )));
    }

    let casted = col.cast(&DataType::Float64)?;
    Ok(casted.f64()?.into_iter().flatten().collect())
}

/// Read a column as categorical levels.
///
/// Numeric columns are rendered in their integer form when integral, so a
/// 0/1 flag yields the levels "0" and "1".
pub(crate) fn level_values(df: &DataFrame, column: &str) -> Result<Vec<String>> {
    let col = df
        .column(column)
        .map_err(|_| CostError::SchemaError(format!("missing required column '{}'", column)))?;

    match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| {
                v.map(str::to_string).ok_or_else(|| {
                    CostError::SchemaError(format!("column '{}' has missing values", column))
                })
            })
            .collect(),
        _ => Ok(numeric_values(df, column)?
            .into_iter()
            .map(format_level)
            .collect()),
    }
}

/// Textual form of a numeric level
pub(crate) fn format_level(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_values_rejects_missing() {
        let df = df!("a" => &[Some(1.0), None, Some(3.0)]).unwrap();
        assert!(matches!(
            numeric_values(&df, "a"),
            Err(CostError::SchemaError(_))
        ));
    }

    #[test]
    fn test_level_values_from_flags() {
        let df = df!("flag" => &[1i64, 0, 1]).unwrap();
        assert_eq!(level_values(&df, "flag").unwrap(), vec!["1", "0", "1"]);
    }

    #[test]
    fn test_format_level() {
        assert_eq!(format_level(1.0), "1");
        assert_eq!(format_level(0.5), "0.5");
    }
}
