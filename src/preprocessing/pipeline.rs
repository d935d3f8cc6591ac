//! Column transformer: per-group preprocessing assembled into one feature matrix

use crate::error::{Result, ServeError};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use super::{
    encoder::OneHotEncoder, imputer::Imputer, numeric_column, scaler::Scaler, string_column,
};

/// A named group of columns sharing one preprocessing chain.
///
/// Groups with an encoder are categorical (impute, then one-hot); all
/// others are numeric (impute, then scale).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnGroup {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imputer: Option<Imputer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler: Option<Scaler>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoder: Option<OneHotEncoder>,
}

impl ColumnGroup {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            imputer: None,
            scaler: None,
            encoder: None,
        }
    }

    pub fn with_imputer(mut self, imputer: Imputer) -> Self {
        self.imputer = Some(imputer);
        self
    }

    pub fn with_scaler(mut self, scaler: Scaler) -> Self {
        self.scaler = Some(scaler);
        self
    }

    pub fn with_encoder(mut self, encoder: OneHotEncoder) -> Self {
        self.encoder = Some(encoder);
        self
    }

    /// Number of output features
    pub fn n_outputs(&self) -> usize {
        match &self.encoder {
            Some(encoder) => self.columns.iter().map(|c| encoder.n_outputs(c)).sum(),
            None => self.columns.len(),
        }
    }

    /// Output feature names in matrix order
    pub fn output_names(&self) -> Vec<String> {
        match &self.encoder {
            Some(encoder) => self
                .columns
                .iter()
                .flat_map(|c| encoder.output_names(c))
                .collect(),
            None => self.columns.clone(),
        }
    }

    /// Fit every stage of the group, each on the output of the previous one
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        for col_name in &self.columns {
            if self.encoder.is_some() {
                let mut values = string_column(df, col_name)?;
                if let Some(imputer) = self.imputer.as_mut() {
                    imputer.fit_text(col_name, &values)?;
                    values = imputer.fill_text(col_name, &values)?;
                }
                if let Some(encoder) = self.encoder.as_mut() {
                    encoder.fit_column(col_name, &values);
                }
            } else {
                let values = numeric_column(df, col_name)?;
                let dense = match self.imputer.as_mut() {
                    Some(imputer) => {
                        imputer.fit_numeric(col_name, &values)?;
                        imputer.fill_numeric(col_name, &values)?
                    }
                    None => values.iter().map(|v| v.unwrap_or(f64::NAN)).collect(),
                };
                if let Some(scaler) = self.scaler.as_mut() {
                    scaler.fit_column(col_name, &dense)?;
                }
            }
        }
        Ok(self)
    }

    /// Append this group's output columns (column-major) to `out`
    fn transform_into(&self, df: &DataFrame, out: &mut Vec<Vec<f64>>) -> Result<()> {
        for col_name in &self.columns {
            match &self.encoder {
                Some(encoder) => {
                    let mut values = string_column(df, col_name)?;
                    if let Some(imputer) = &self.imputer {
                        values = imputer.fill_text(col_name, &values)?;
                    }
                    out.extend(encoder.encode(col_name, &values)?);
                }
                None => {
                    let values = numeric_column(df, col_name)?;
                    let mut dense = match &self.imputer {
                        Some(imputer) => imputer.fill_numeric(col_name, &values)?,
                        None => values.iter().map(|v| v.unwrap_or(f64::NAN)).collect(),
                    };
                    if let Some(scaler) = &self.scaler {
                        scaler.scale(col_name, &mut dense)?;
                    }
                    out.push(dense);
                }
            }
        }
        Ok(())
    }
}

/// Ordered column groups whose outputs are concatenated horizontally.
/// Input columns not named by any group are dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnTransformer {
    transformers: Vec<ColumnGroup>,
}

impl ColumnTransformer {
    pub fn new(transformers: Vec<ColumnGroup>) -> Self {
        Self { transformers }
    }

    pub fn transformers(&self) -> &[ColumnGroup] {
        &self.transformers
    }

    /// Width of the produced feature matrix
    pub fn output_width(&self) -> usize {
        self.transformers.iter().map(ColumnGroup::n_outputs).sum()
    }

    pub fn output_names(&self) -> Vec<String> {
        self.transformers
            .iter()
            .flat_map(ColumnGroup::output_names)
            .collect()
    }

    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        for group in &mut self.transformers {
            group.fit(df)?;
        }
        Ok(self)
    }

    /// Transform a frame into a dense `(rows, output_width)` matrix
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let start = Instant::now();
        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(self.output_width());
        for group in &self.transformers {
            group.transform_into(df, &mut columns)?;
        }

        let matrix = assemble(df.height(), &columns)?;
        debug!(
            rows = matrix.nrows(),
            features = matrix.ncols(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Column transform complete"
        );
        Ok(matrix)
    }
}

/// Passthrough conversion used when a pipeline has no column transformer:
/// every column, in frame order, cast to float.
pub fn frame_to_matrix(df: &DataFrame) -> Result<Array2<f64>> {
    let columns = df
        .get_column_names()
        .into_iter()
        .map(|name| {
            numeric_column(df, name.as_str())
                .map(|values| values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;
    assemble(df.height(), &columns)
}

fn assemble(n_rows: usize, columns: &[Vec<f64>]) -> Result<Array2<f64>> {
    if let Some(bad) = columns.iter().find(|c| c.len() != n_rows) {
        return Err(ServeError::ShapeError {
            expected: format!("{} rows", n_rows),
            actual: format!("{} rows", bad.len()),
        });
    }
    Ok(Array2::from_shape_fn((n_rows, columns.len()), |(i, j)| columns[j][i]))
}
