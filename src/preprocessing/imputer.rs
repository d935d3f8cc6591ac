//! Missing value imputation strategies

use crate::error::{Result, ServeError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::is_missing;

/// Strategy for imputing missing values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    /// Replace with mean (numeric only)
    Mean,
    /// Replace with median (numeric only)
    Median,
    /// Replace with mode / most frequent value
    MostFrequent,
    /// Replace with a constant value
    Constant(FillValue),
}

/// A fitted fill value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillValue {
    Number(f64),
    Text(String),
}

impl FillValue {
    fn as_number(&self) -> Option<f64> {
        match self {
            FillValue::Number(v) => Some(*v),
            FillValue::Text(s) => s.trim().parse().ok(),
        }
    }

    fn as_text(&self) -> String {
        match self {
            FillValue::Number(v) => v.to_string(),
            FillValue::Text(s) => s.clone(),
        }
    }
}

/// Imputer for handling missing values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: HashMap<String, FillValue>,
}

impl Imputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: HashMap::new(),
        }
    }

    /// Fitted fill value for a column
    pub fn fill_value(&self, column: &str) -> Option<&FillValue> {
        self.fill_values.get(column)
    }

    /// Fit the fill value of a numeric column
    pub fn fit_numeric(&mut self, column: &str, values: &[Option<f64>]) -> Result<&mut Self> {
        let observed: Vec<f64> = values
            .iter()
            .filter(|v| !is_missing(**v))
            .flatten()
            .copied()
            .collect();

        let fill = match &self.strategy {
            ImputeStrategy::Constant(value) => value.clone(),
            _ if observed.is_empty() => {
                return Err(ServeError::PreprocessingError(format!(
                    "column '{}' has no observed values to impute from",
                    column
                )))
            }
            ImputeStrategy::Mean => {
                FillValue::Number(observed.iter().sum::<f64>() / observed.len() as f64)
            }
            ImputeStrategy::Median => FillValue::Number(median(observed)),
            ImputeStrategy::MostFrequent => FillValue::Number(mode_numeric(&observed)),
        };

        self.fill_values.insert(column.to_string(), fill);
        Ok(self)
    }

    /// Fit the fill value of a categorical column
    pub fn fit_text(&mut self, column: &str, values: &[Option<String>]) -> Result<&mut Self> {
        let fill = match &self.strategy {
            ImputeStrategy::Constant(value) => value.clone(),
            ImputeStrategy::MostFrequent => {
                let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
                for v in values.iter().flatten() {
                    *counts.entry(v.as_str()).or_insert(0) += 1;
                }
                // BTreeMap iterates in sorted order, so ties resolve to the smallest category
                let best = counts
                    .iter()
                    .fold(None, |best: Option<(&str, usize)>, (k, c)| match best {
                        Some((_, bc)) if bc >= *c => best,
                        _ => Some((*k, *c)),
                    })
                    .ok_or_else(|| {
                        ServeError::PreprocessingError(format!(
                            "column '{}' has no observed values to impute from",
                            column
                        ))
                    })?;
                FillValue::Text(best.0.to_string())
            }
            other => {
                return Err(ServeError::PreprocessingError(format!(
                    "strategy {:?} requires numeric data, column '{}' is categorical",
                    other, column
                )))
            }
        };

        self.fill_values.insert(column.to_string(), fill);
        Ok(self)
    }

    /// Replace missing numeric values. Values that stay missing come back as NaN.
    pub fn fill_numeric(&self, column: &str, values: &[Option<f64>]) -> Result<Vec<f64>> {
        let fill = self.lookup(column)?.as_number().ok_or_else(|| {
            ServeError::PreprocessingError(format!(
                "fill value for numeric column '{}' is not a number",
                column
            ))
        })?;

        Ok(values
            .iter()
            .map(|v| if is_missing(*v) { fill } else { v.unwrap_or(fill) })
            .collect())
    }

    /// Replace missing categorical values
    pub fn fill_text(&self, column: &str, values: &[Option<String>]) -> Result<Vec<Option<String>>> {
        let fill = self.lookup(column)?.as_text();
        Ok(values
            .iter()
            .map(|v| Some(v.clone().unwrap_or_else(|| fill.clone())))
            .collect())
    }

    fn lookup(&self, column: &str) -> Result<&FillValue> {
        self.fill_value(column).ok_or_else(|| {
            ServeError::PreprocessingError(format!("imputer was not fitted on column '{}'", column))
        })
    }
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

/// Most frequent value; ties resolve to the smallest value
fn mode_numeric(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut best = sorted[0];
    let mut best_count = 0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        if j - i > best_count {
            best_count = j - i;
            best = sorted[i];
        }
        i = j;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_imputation() {
        let mut imputer = Imputer::new(ImputeStrategy::Mean);
        let values = [Some(1.0), None, Some(3.0), Some(f64::NAN)];
        imputer.fit_numeric("a", &values).unwrap();

        let filled = imputer.fill_numeric("a", &values).unwrap();
        assert_eq!(filled, vec![1.0, 2.0, 3.0, 2.0]);
    }

    #[test]
    fn test_median_imputation() {
        let mut imputer = Imputer::new(ImputeStrategy::Median);
        imputer
            .fit_numeric("delay", &[Some(0.0), Some(10.0), Some(4.0), None])
            .unwrap();
        assert_eq!(imputer.fill_value("delay"), Some(&FillValue::Number(4.0)));
    }

    #[test]
    fn test_most_frequent_numeric_tie_takes_smallest() {
        let mut imputer = Imputer::new(ImputeStrategy::MostFrequent);
        imputer
            .fit_numeric("x", &[Some(3.0), Some(1.0), Some(3.0), Some(1.0)])
            .unwrap();
        assert_eq!(imputer.fill_value("x"), Some(&FillValue::Number(1.0)));
    }

    #[test]
    fn test_most_frequent_text() {
        let mut imputer = Imputer::new(ImputeStrategy::MostFrequent);
        let values = vec![
            Some("Eco".to_string()),
            Some("Business".to_string()),
            Some("Eco".to_string()),
            None,
        ];
        imputer.fit_text("Class", &values).unwrap();

        let filled = imputer.fill_text("Class", &values).unwrap();
        assert_eq!(filled[3].as_deref(), Some("Eco"));
    }

    #[test]
    fn test_constant_imputation() {
        let mut imputer = Imputer::new(ImputeStrategy::Constant(FillValue::Text("missing".into())));
        imputer.fit_text("Gender", &[None]).unwrap();
        let filled = imputer.fill_text("Gender", &[None]).unwrap();
        assert_eq!(filled[0].as_deref(), Some("missing"));
    }

    #[test]
    fn test_mean_rejected_for_text() {
        let mut imputer = Imputer::new(ImputeStrategy::Mean);
        assert!(imputer.fit_text("Gender", &[Some("Male".into())]).is_err());
    }

    #[test]
    fn test_unfitted_column() {
        let imputer = Imputer::new(ImputeStrategy::Mean);
        assert!(imputer.fill_numeric("a", &[None]).is_err());
    }

    #[test]
    fn test_strategy_serialization() {
        let json = serde_json::to_string(&ImputeStrategy::MostFrequent).unwrap();
        assert_eq!(json, "\"most_frequent\"");

        let constant: ImputeStrategy = serde_json::from_str(r#"{"constant": 0.0}"#).unwrap();
        assert_eq!(constant, ImputeStrategy::Constant(FillValue::Number(0.0)));
    }
}
