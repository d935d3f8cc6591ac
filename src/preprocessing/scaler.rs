//! Feature scaling implementations

use crate::error::{Result, ServeError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Type of scaler to use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerType {
    /// Standard scaling (z-score normalization): (x - mean) / std
    Standard,
    /// Min-Max scaling: (x - min) / (max - min)
    MinMax,
    /// Robust scaling using median and IQR
    Robust,
    /// Max absolute scaling: x / max(|x|)
    MaxAbs,
    /// No scaling
    None,
}

/// Parameters for a fitted scaler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub center: f64,
    pub scale: f64,
}

/// Feature scaler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    params: HashMap<String, ScalerParams>,
}

impl Scaler {
    /// Create a new scaler
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            params: HashMap::new(),
        }
    }

    /// Fitted parameters for a column
    pub fn params(&self, column: &str) -> Option<&ScalerParams> {
        self.params.get(column)
    }

    /// Fit one column; NaN entries are ignored
    pub fn fit_column(&mut self, column: &str, values: &[f64]) -> Result<&mut Self> {
        let mut observed: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if observed.is_empty() {
            return Err(ServeError::PreprocessingError(format!(
                "column '{}' has no values to fit a scaler on",
                column
            )));
        }

        let params = self.compute_params(&mut observed);
        self.params.insert(column.to_string(), params);
        Ok(self)
    }

    /// Scale values of a column in place
    pub fn scale(&self, column: &str, values: &mut [f64]) -> Result<()> {
        let params = self.params.get(column).ok_or_else(|| {
            ServeError::PreprocessingError(format!("scaler was not fitted on column '{}'", column))
        })?;

        for v in values.iter_mut() {
            *v = (*v - params.center) / params.scale;
        }
        Ok(())
    }

    fn compute_params(&self, observed: &mut [f64]) -> ScalerParams {
        let non_zero = |s: f64| if s == 0.0 { 1.0 } else { s };

        match self.scaler_type {
            ScalerType::Standard => {
                let n = observed.len() as f64;
                let mean = observed.iter().sum::<f64>() / n;
                let var = observed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                ScalerParams {
                    center: mean,
                    scale: non_zero(var.sqrt()),
                }
            }
            ScalerType::MinMax => {
                let min = observed.iter().copied().fold(f64::INFINITY, f64::min);
                let max = observed.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                ScalerParams {
                    center: min,
                    scale: non_zero(max - min),
                }
            }
            ScalerType::Robust => {
                observed.sort_by(f64::total_cmp);
                let q1 = quantile(observed, 0.25);
                let q3 = quantile(observed, 0.75);
                ScalerParams {
                    center: quantile(observed, 0.5),
                    scale: non_zero(q3 - q1),
                }
            }
            ScalerType::MaxAbs => {
                let max_abs = observed.iter().fold(0.0f64, |a, b| a.max(b.abs()));
                ScalerParams {
                    center: 0.0,
                    scale: non_zero(max_abs),
                }
            }
            ScalerType::None => ScalerParams {
                center: 0.0,
                scale: 1.0,
            },
        }
    }
}

/// Linear-interpolated quantile of sorted data
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_scaler() {
        let mut scaler = Scaler::new(ScalerType::Standard);
        scaler.fit_column("a", &[1.0, 2.0, f64::NAN, 3.0, 4.0, 5.0]).unwrap();

        let mut values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        scaler.scale("a", &mut values).unwrap();
        let mean: f64 = values.iter().sum::<f64>() / 5.0;
        assert!(mean.abs() < 1e-10);
        assert!((values[4] - 2.0f64.sqrt()).abs() < 1e-10);
    }

    #[test]
    fn test_minmax_scaler() {
        let mut scaler = Scaler::new(ScalerType::MinMax);
        scaler.fit_column("a", &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();

        let mut values = vec![1.0, 3.0, 5.0];
        scaler.scale("a", &mut values).unwrap();
        assert_eq!(values, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_robust_scaler() {
        let mut scaler = Scaler::new(ScalerType::Robust);
        scaler.fit_column("a", &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let params = scaler.params("a").unwrap();
        assert_eq!(params.center, 3.0);
        assert_eq!(params.scale, 2.0);
    }

    #[test]
    fn test_constant_column_keeps_unit_scale() {
        let mut scaler = Scaler::new(ScalerType::Standard);
        scaler.fit_column("a", &[7.0, 7.0, 7.0]).unwrap();
        assert_eq!(scaler.params("a").unwrap().scale, 1.0);
    }

    #[test]
    fn test_maxabs_scaler() {
        let mut scaler = Scaler::new(ScalerType::MaxAbs);
        scaler.fit_column("a", &[-4.0, 2.0]).unwrap();
        let mut values = vec![2.0, -4.0];
        scaler.scale("a", &mut values).unwrap();
        assert_eq!(values, vec![0.5, -1.0]);
    }

    #[test]
    fn test_unfitted_column() {
        let scaler = Scaler::new(ScalerType::Standard);
        assert!(scaler.scale("a", &mut [1.0]).is_err());
    }
}
