//! One-of-k encoding for categorical columns

use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::level_values;

/// Sorted set of levels seen for one column during fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub column: String,
    pub levels: Vec<String>,
}

impl Vocabulary {
    /// Position of `level` in the vocabulary; `None` for unseen levels
    #[inline]
    pub fn index_of(&self, level: &str) -> Option<usize> {
        self.levels
            .binary_search_by(|probe| probe.as_str().cmp(level))
            .ok()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Output feature names, `<column>_<level>`
    pub fn feature_names(&self) -> impl Iterator<Item = String> + '_ {
        self.levels.iter().map(move |l| format!("{}_{}", self.column, l))
    }

    /// Write the indicator block for `level` into `out`.
    ///
    /// `out` must be `len()` wide. Unseen levels leave it all zero.
    pub fn encode_into(&self, level: &str, out: &mut [f64]) {
        out.iter_mut().for_each(|v| *v = 0.0);
        if let Some(idx) = self.index_of(level) {
            out[idx] = 1.0;
        }
    }
}

/// One-hot encoder that ignores unknown levels
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    vocabularies: Vec<Vocabulary>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the distinct levels of each column, sorted lexicographically
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        let mut vocabularies = Vec::with_capacity(columns.len());
        for column in columns {
            let mut levels = level_values(df, column)?;
            levels.sort();
            levels.dedup();
            vocabularies.push(Vocabulary {
                column: column.clone(),
                levels,
            });
        }

        self.vocabularies = vocabularies;
        self.is_fitted = true;
        Ok(self)
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn vocabularies(&self) -> &[Vocabulary] {
        &self.vocabularies
    }

    /// Total width of all indicator blocks
    pub fn n_features(&self) -> usize {
        self.vocabularies.iter().map(Vocabulary::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted() -> OneHotEncoder {
        let df = df!(
            "kind" => &["Routine", "Corrective", "Routine", "Preventive"],
            "flag" => &[0i64, 1, 0, 0]
        )
        .unwrap();
        let mut enc = OneHotEncoder::new();
        enc.fit(&df, &["kind".to_string(), "flag".to_string()]).unwrap();
        enc
    }

    #[test]
    fn test_levels_are_sorted() {
        let enc = fitted();
        assert_eq!(
            enc.vocabularies()[0].levels,
            vec!["Corrective", "Preventive", "Routine"]
        );
        assert_eq!(enc.vocabularies()[1].levels, vec!["0", "1"]);
        assert_eq!(enc.n_features(), 5);
    }

    #[test]
    fn test_indicator_block() {
        let enc = fitted();
        let vocab = &enc.vocabularies()[0];
        let mut out = vec![9.0; vocab.len()];
        vocab.encode_into("Preventive", &mut out);
        assert_eq!(out, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_unseen_level_is_all_zero() {
        let enc = fitted();
        let vocab = &enc.vocabularies()[0];
        let mut out = vec![1.0; vocab.len()];
        vocab.encode_into("Emergency", &mut out);
        assert_eq!(out, vec![0.0, 0.0, 0.0]);
        assert_eq!(vocab.index_of("Emergency"), None);
    }

    #[test]
    fn test_feature_names() {
        let enc = fitted();
        let names: Vec<String> = enc.vocabularies()[1].feature_names().collect();
        assert_eq!(names, vec!["flag_0", "flag_1"]);
    }
}
