//! Raw table ingestion and train/test split

use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{CostError, Result};
use crate::schema::FeatureSchema;
use crate::utils::{DataLoader, DataSaver};

/// Paths of the written split files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPaths {
    pub train: PathBuf,
    pub test: PathBuf,
}

/// Reads the raw table, checks its columns and writes a seeded split
#[derive(Debug, Clone)]
pub struct DataIngestion {
    schema: FeatureSchema,
    test_size: f64,
    seed: u64,
    loader: DataLoader,
}

impl DataIngestion {
    pub fn new(schema: FeatureSchema, test_size: f64, seed: u64) -> Self {
        Self {
            schema,
            test_size,
            seed,
            loader: DataLoader::new(),
        }
    }

    /// Row indices of the train and test sides for `n_rows` rows.
    ///
    /// The test side gets `ceil(n_rows * test_size)` rows; both sides must be
    /// non-empty.
    pub fn split_indices(&self, n_rows: usize) -> Result<(Vec<IdxSize>, Vec<IdxSize>)> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(CostError::ConfigError(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        let n_test = (n_rows as f64 * self.test_size).ceil() as usize;
        if n_test == 0 || n_test >= n_rows {
            return Err(CostError::DataError(format!(
                "cannot split {} rows with test_size {}",
                n_rows, self.test_size
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut order: Vec<IdxSize> = (0..n_rows as IdxSize).collect();
        order.shuffle(&mut rng);

        let train = order.split_off(n_test);
        Ok((train, order))
    }

    /// Split an in-memory table into (train, test)
    pub fn split(&self, df: &DataFrame) -> Result<(DataFrame, DataFrame)> {
        let (train_idx, test_idx) = self.split_indices(df.height())?;
        let train = df.take(&IdxCa::from_vec("idx".into(), train_idx))?;
        let test = df.take(&IdxCa::from_vec("idx".into(), test_idx))?;
        Ok((train, test))
    }

    /// Load `raw`, split it and write `train.csv`/`test.csv` under `split_dir`
    pub fn run(&self, raw: impl AsRef<Path>, split_dir: impl AsRef<Path>) -> Result<SplitPaths> {
        let raw = raw.as_ref();
        let split_dir = split_dir.as_ref();

        let df = self.loader.load_csv(raw)?;
        self.schema.check_table(&df, true)?;

        let (mut train, mut test) = self.split(&df)?;
        let paths = SplitPaths {
            train: split_dir.join("train.csv"),
            test: split_dir.join("test.csv"),
        };
        DataSaver::save_csv(&mut train, &paths.train)?;
        DataSaver::save_csv(&mut test, &paths.test)?;

        info!(
            source = %raw.display(),
            rows = df.height(),
            train_rows = train.height(),
            test_rows = test.height(),
            "Ingestion complete"
        );
        Ok(paths)
    }
}
