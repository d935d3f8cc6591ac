//! Training data preparation
//!
//! Helpers that turn a raw survey CSV into train/test tables for an external
//! trainer: missing value handling, one-hot encoding and a seeded split.

mod prep;
mod split;

pub use prep::{categorical_columns, drop_missing, forward_fill, one_hot_encode};
pub use split::{train_test_split, SplitConfig, TrainTestSplit};
