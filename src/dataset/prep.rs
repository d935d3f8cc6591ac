//! Cleaning and encoding of raw training tables

use crate::error::{Result, ServeError};
use crate::preprocessing::string_column;
use polars::prelude::*;
use std::collections::BTreeSet;
use tracing::debug;

/// Drop every row that has a null in any column
pub fn drop_missing(df: &DataFrame) -> Result<DataFrame> {
    let cleaned = df.drop_nulls::<String>(None)?;
    debug!(
        before = df.height(),
        after = cleaned.height(),
        "Dropped rows with missing values"
    );
    Ok(cleaned)
}

/// Fill nulls with the last observed value of the same column.
/// Leading nulls have nothing to copy and stay null.
pub fn forward_fill(df: &DataFrame) -> Result<DataFrame> {
    Ok(df.fill_null(FillNullStrategy::Forward(None))?)
}

/// Names of all string columns, in frame order
pub fn categorical_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| c.dtype() == &DataType::String)
        .map(|c| c.name().to_string())
        .collect()
}

/// Replace categorical columns with 0/1 indicator columns.
///
/// Each column `c` becomes one `c_<category>` column per distinct value, in
/// sorted order; nulls get no indicator. Indicators are appended after the
/// untouched columns. `None` encodes every string column. With `drop_first`
/// the first category of each column is left out.
pub fn one_hot_encode(
    df: &DataFrame,
    columns: Option<&[String]>,
    drop_first: bool,
) -> Result<DataFrame> {
    let columns = match columns {
        Some(cols) => cols.to_vec(),
        None => categorical_columns(df),
    };

    let mut indicators: Vec<Series> = Vec::new();
    for name in &columns {
        let values = string_column(df, name)?;
        let categories: BTreeSet<&str> = values.iter().flatten().map(String::as_str).collect();
        let skip = usize::from(drop_first);

        for category in categories.into_iter().skip(skip) {
            let flags: Vec<i32> = values
                .iter()
                .map(|v| i32::from(v.as_deref() == Some(category)))
                .collect();
            indicators.push(Series::new(format!("{}_{}", name, category).into(), flags));
        }
    }

    let mut encoded = df.clone();
    for name in &columns {
        encoded = encoded.drop(name)?;
    }
    for series in indicators {
        if encoded.get_column_index(series.name()).is_some() {
            return Err(ServeError::DataError(format!(
                "indicator column '{}' collides with an existing column",
                series.name()
            )));
        }
        encoded.with_column(series)?;
    }

    debug!(
        encoded = columns.len(),
        width = encoded.width(),
        "One-hot encoded categorical columns"
    );
    Ok(encoded)
}
