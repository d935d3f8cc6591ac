//! Data preprocessing module
//!
//! Fitted preprocessing stages that turn raw tabular input into the dense
//! feature matrix a classifier consumes:
//! - Missing value imputation
//! - Feature scaling (Standard, MinMax, Robust, MaxAbs)
//! - One-hot encoding of categorical columns
//! - Value clipping after preprocessing
//! - A column transformer composing the above per column group

mod clip;
mod encoder;
mod imputer;
mod pipeline;
mod scaler;

pub use clip::{Clipper, DEFAULT_CLIP_CAP};
pub use encoder::{HandleUnknown, OneHotEncoder};
pub use imputer::{FillValue, ImputeStrategy, Imputer};
pub use pipeline::{frame_to_matrix, ColumnGroup, ColumnTransformer};
pub use scaler::{Scaler, ScalerType};

use crate::error::{Result, ServeError};
use polars::prelude::*;

/// Read a column as nullable floats.
///
/// Nulls stay null so imputers can fill them; a present value that does not
/// parse as a number is an `InvalidInput` error.
pub(crate) fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| ServeError::FeatureNotFound(name.to_string()))?;
    let original = column.as_materialized_series();
    let series = original.cast(&DataType::Float64)?;
    let ca = series.f64()?;

    if ca.null_count() > original.null_count() {
        for (i, value) in ca.into_iter().enumerate() {
            if value.is_some() {
                continue;
            }
            let raw = original.get(i)?;
            if !raw.is_null() {
                return Err(ServeError::InvalidInput(format!(
                    "column '{}' expects a number, got {}",
                    name, raw
                )));
            }
        }
    }
    Ok(ca.into_iter().collect())
}

/// Read a column as nullable strings.
pub(crate) fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| ServeError::FeatureNotFound(name.to_string()))?;
    let series = column.as_materialized_series().cast(&DataType::String)?;
    let ca = series.str()?;
    Ok(ca.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Treat both nulls and NaN as missing, matching how fitted imputers see data.
pub(crate) fn is_missing(value: Option<f64>) -> bool {
    value.map_or(true, f64::is_nan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_column_casts_strings() {
        let df = DataFrame::new(vec![
            Series::new("Age".into(), &[Some("35"), None, Some("41")]).into(),
        ])
        .unwrap();

        let values = numeric_column(&df, "Age").unwrap();
        assert_eq!(values, vec![Some(35.0), None, Some(41.0)]);
    }

    #[test]
    fn test_numeric_column_rejects_unparsable_values() {
        let df = DataFrame::new(vec![
            Series::new("Age".into(), &[Some("35"), None, Some("not a number")]).into(),
        ])
        .unwrap();

        let err = numeric_column(&df, "Age").unwrap_err();
        match err {
            ServeError::InvalidInput(msg) => {
                assert!(msg.contains("'Age'"));
                assert!(msg.contains("not a number"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_string_column_casts_numbers() {
        let df = DataFrame::new(vec![
            Series::new("Class".into(), &[1i64, 2, 3]).into(),
        ])
        .unwrap();

        let values = string_column(&df, "Class").unwrap();
        assert_eq!(values[0].as_deref(), Some("1"));
    }

    #[test]
    fn test_missing_column() {
        let df = DataFrame::new(vec![Series::new("a".into(), &[1.0]).into()]).unwrap();
        let err = numeric_column(&df, "b").unwrap_err();
        assert!(matches!(err, ServeError::FeatureNotFound(name) if name == "b"));
    }

    #[test]
    fn test_is_missing() {
        assert!(is_missing(None));
        assert!(is_missing(Some(f64::NAN)));
        assert!(!is_missing(Some(0.0)));
    }
}
