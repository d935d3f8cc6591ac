//! Seeded train/test split

use crate::error::{Result, ServeError};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Split options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of rows held out for testing, in (0, 1)
    pub test_size: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            seed: 42,
        }
    }
}

impl SplitConfig {
    pub fn new(test_size: f64, seed: u64) -> Self {
        Self { test_size, seed }
    }

    /// Test rows for a table of `n_samples` rows (rounded up)
    pub fn n_test(&self, n_samples: usize) -> usize {
        (self.test_size * n_samples as f64).ceil() as usize
    }
}

/// Features and target, each split into train and test rows
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: DataFrame,
    pub x_test: DataFrame,
    pub y_train: Series,
    pub y_test: Series,
}

impl TrainTestSplit {
    /// Training rows with the target appended as the last column
    pub fn train_frame(&self) -> Result<DataFrame> {
        let mut df = self.x_train.clone();
        df.with_column(self.y_train.clone())?;
        Ok(df)
    }

    /// Test rows with the target appended as the last column
    pub fn test_frame(&self) -> Result<DataFrame> {
        let mut df = self.x_test.clone();
        df.with_column(self.y_test.clone())?;
        Ok(df)
    }
}

/// Shuffle rows with a seeded RNG and hold out `test_size` of them
pub fn train_test_split(df: &DataFrame, target: &str, config: &SplitConfig) -> Result<TrainTestSplit> {
    if !(config.test_size > 0.0 && config.test_size < 1.0) {
        return Err(ServeError::InvalidInput(format!(
            "test_size must be in (0, 1), got {}",
            config.test_size
        )));
    }

    let y = df
        .column(target)
        .map_err(|_| ServeError::FeatureNotFound(target.to_string()))?
        .as_materialized_series()
        .clone();
    let x = df.drop(target)?;

    let n_samples = df.height();
    let n_test = config.n_test(n_samples);
    if n_test == 0 || n_test >= n_samples {
        return Err(ServeError::InvalidInput(format!(
            "cannot split {} rows with test_size {}",
            n_samples, config.test_size
        )));
    }

    let mut indices: Vec<IdxSize> = (0..n_samples as IdxSize).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    indices.shuffle(&mut rng);

    let test_idx = IdxCa::from_vec("idx".into(), indices[..n_test].to_vec());
    let train_idx = IdxCa::from_vec("idx".into(), indices[n_test..].to_vec());

    Ok(TrainTestSplit {
        x_train: x.take(&train_idx)?,
        x_test: x.take(&test_idx)?,
        y_train: y.take(&train_idx)?,
        y_test: y.take(&test_idx)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n: i64) -> DataFrame {
        DataFrame::new(vec![
            Series::new("id".into(), (0..n).collect::<Vec<_>>()).into(),
            Series::new("satisfaction".into(), (0..n).map(|i| i % 2).collect::<Vec<_>>()).into(),
        ])
        .unwrap()
    }

    #[test]
    fn test_split_sizes() {
        let split = train_test_split(&frame(10), "satisfaction", &SplitConfig::default()).unwrap();
        assert_eq!(split.x_train.height(), 8);
        assert_eq!(split.x_test.height(), 2);
        assert_eq!(split.y_train.len(), 8);
        assert!(split.x_train.column("satisfaction").is_err());
    }

    #[test]
    fn test_test_size_rounds_up() {
        let split = train_test_split(&frame(11), "satisfaction", &SplitConfig::default()).unwrap();
        assert_eq!(split.x_test.height(), 3);
        assert_eq!(split.x_train.height(), 8);
    }

    #[test]
    fn test_split_is_deterministic_and_disjoint() {
        let df = frame(50);
        let a = train_test_split(&df, "satisfaction", &SplitConfig::default()).unwrap();
        let b = train_test_split(&df, "satisfaction", &SplitConfig::default()).unwrap();
        assert!(a.x_test.equals(&b.x_test));

        let mut ids: Vec<i64> = a
            .x_train
            .column("id")
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .chain(a.x_test.column("id").unwrap().i64().unwrap().into_no_null_iter())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_rows_stay_aligned() {
        let split = train_test_split(&frame(20), "satisfaction", &SplitConfig::new(0.25, 7)).unwrap();
        let train = split.train_frame().unwrap();
        for (id, label) in train
            .column("id")
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .zip(train.column("satisfaction").unwrap().i64().unwrap().into_no_null_iter())
        {
            assert_eq!(id % 2, label);
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let df = frame(10);
        assert!(matches!(
            train_test_split(&df, "missing", &SplitConfig::default()),
            Err(ServeError::FeatureNotFound(_))
        ));
        assert!(train_test_split(&df, "satisfaction", &SplitConfig::new(1.0, 42)).is_err());
        assert!(train_test_split(&frame(1), "satisfaction", &SplitConfig::default()).is_err());
    }
}
