//! One-hot encoding of categorical columns

use crate::error::{Result, ServeError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// What to do with a category that was not seen during fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    /// Encode as an all-zero block
    #[default]
    Ignore,
    /// Fail the transform
    Error,
}

/// One-hot encoder with per-column ordered categories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    categories: HashMap<String, Vec<String>>,
    #[serde(default)]
    handle_unknown: HandleUnknown,
    #[serde(default)]
    drop_first: bool,
}

impl Default for OneHotEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self {
            categories: HashMap::new(),
            handle_unknown: HandleUnknown::Ignore,
            drop_first: false,
        }
    }

    pub fn with_handle_unknown(mut self, handle_unknown: HandleUnknown) -> Self {
        self.handle_unknown = handle_unknown;
        self
    }

    /// Drop the first category of every column (dummy coding)
    pub fn with_drop_first(mut self, drop_first: bool) -> Self {
        self.drop_first = drop_first;
        self
    }

    /// Fitted categories of a column
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.categories.get(column).map(Vec::as_slice)
    }

    /// Fit one column; categories are stored sorted, nulls are not a category
    pub fn fit_column(&mut self, column: &str, values: &[Option<String>]) -> &mut Self {
        let unique: BTreeSet<&str> = values.iter().flatten().map(String::as_str).collect();
        self.categories.insert(
            column.to_string(),
            unique.into_iter().map(str::to_string).collect(),
        );
        self
    }

    /// Number of output columns produced for a column
    pub fn n_outputs(&self, column: &str) -> usize {
        self.categories(column)
            .map(|c| self.kept(c).len())
            .unwrap_or(0)
    }

    /// Output feature names, `<column>_<category>`
    pub fn output_names(&self, column: &str) -> Vec<String> {
        self.categories(column)
            .map(|c| {
                self.kept(c)
                    .iter()
                    .map(|cat| format!("{}_{}", column, cat))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Encode a column into its one-hot block, one output vector per kept category
    pub fn encode(&self, column: &str, values: &[Option<String>]) -> Result<Vec<Vec<f64>>> {
        let categories = self.categories(column).ok_or_else(|| {
            ServeError::PreprocessingError(format!("encoder was not fitted on column '{}'", column))
        })?;
        let kept = self.kept(categories);
        let offset = categories.len() - kept.len();

        let mut block = vec![vec![0.0; values.len()]; kept.len()];
        for (row, value) in values.iter().enumerate() {
            let position = value
                .as_deref()
                .and_then(|v| categories.iter().position(|c| c == v));

            match position {
                Some(idx) if idx >= offset => block[idx - offset][row] = 1.0,
                Some(_) => {}
                None if self.handle_unknown == HandleUnknown::Ignore => {}
                None => {
                    return Err(ServeError::PreprocessingError(format!(
                        "Found unknown category {:?} in column '{}' during transform",
                        value.as_deref().unwrap_or("null"),
                        column
                    )))
                }
            }
        }

        Ok(block)
    }

    fn kept<'a>(&self, categories: &'a [String]) -> &'a [String] {
        if self.drop_first && !categories.is_empty() {
            &categories[1..]
        } else {
            categories
        }
    }
}
