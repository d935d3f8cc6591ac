//! Inference engine implementation
//!
//! Runs a loaded model pipeline end to end:
//! - Coercion of a JSON record into a one-row frame shaped by the feature schema
//! - Column transform, clipping, and a finite-value check on the feature matrix
//! - Label and probability scoring, chunked across rayon workers for large tables
//! - Batch CSV scoring with a JSON preview and CSV output

use crate::error::{Result, ServeError};
use crate::preprocessing::{frame_to_matrix, Clipper, ColumnTransformer};
use crate::utils::{DataLoader, DataSaver};
use super::artifact::{ModelArtifact, Stage};
use super::classifier::{FittedModel, Scored};
use super::schema::FeatureSchema;
use super::InferenceConfig;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Column appended to batch output with the predicted label
pub const PRED_COLUMN: &str = "pred";
/// Column appended to batch output with the positive-class probability
pub const PROBA_COLUMN: &str = "proba";

/// Outcome of a single-record prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction: i64,
    /// `None` when the model produces labels only
    pub probability: Option<f64>,
}

/// Outcome of a batch prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// Leading rows of the augmented table as JSON objects
    pub preview: Vec<Map<String, Value>>,
    /// Full augmented table as CSV text
    pub csv: String,
}

/// A loaded, immutable prediction pipeline
#[derive(Debug)]
pub struct InferenceEngine {
    config: InferenceConfig,
    target: String,
    schema: FeatureSchema,
    transformer: Option<ColumnTransformer>,
    clippers: Vec<Clipper>,
    model: FittedModel,
    /// Dedicated scoring pool when `n_workers` is set
    pool: Option<rayon::ThreadPool>,
}

impl InferenceEngine {
    /// Build an engine from a parsed artifact.
    ///
    /// The pipeline must be an optional leading column transformer, any number
    /// of clip stages, and a terminal classifier.
    pub fn from_artifact(artifact: ModelArtifact, config: InferenceConfig) -> Result<Self> {
        let schema = FeatureSchema::derive_or_empty(&artifact);
        let ModelArtifact { target, steps } = artifact;
        let n_steps = steps.len();

        let mut transformer = None;
        let mut clippers = Vec::new();
        let mut model = None;

        for (i, step) in steps.into_iter().enumerate() {
            match step.stage {
                Stage::ColumnTransformer(t) if i == 0 => transformer = Some(t),
                Stage::Clip(c) if model.is_none() => {
                    c.validate()?;
                    clippers.push(c);
                }
                Stage::Classifier { model: spec } if i + 1 == n_steps => {
                    model = Some(spec.into_model()?);
                }
                other => {
                    return Err(ServeError::InvalidArtifact(format!(
                        "unexpected {} stage '{}' at position {}",
                        other.kind(),
                        step.name,
                        i
                    )))
                }
            }
        }

        let model = model.ok_or_else(|| {
            ServeError::InvalidArtifact("pipeline does not end with a classifier".to_string())
        })?;

        if let Some(t) = &transformer {
            if t.output_width() != model.n_features() {
                warn!(
                    transformer_width = t.output_width(),
                    model_features = model.n_features(),
                    "Preprocessor output width does not match the classifier"
                );
            }
        }

        let pool = match config.n_workers {
            Some(n_workers) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n_workers)
                    .build()
                    .map_err(|e| ServeError::Internal(format!("Thread pool error: {}", e)))?,
            ),
            None => None,
        };

        Ok(Self {
            config,
            target,
            schema,
            transformer,
            clippers,
            model,
            pool,
        })
    }

    /// Load from an artifact file
    pub fn load(path: impl AsRef<Path>, config: InferenceConfig) -> Result<Self> {
        let start = Instant::now();
        let path = path.as_ref();
        let engine = Self::from_artifact(ModelArtifact::load(path)?, config)?;

        info!(
            path = %path.display(),
            model = engine.model.kind(),
            numerical = engine.schema.numerical.len(),
            categorical = engine.schema.categorical.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model loaded"
        );
        Ok(engine)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn model(&self) -> &FittedModel {
        &self.model
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Shape a JSON record into a one-row frame.
    ///
    /// Columns are the schema's numerical then categorical names, each filled
    /// from the record or null. Extra record keys are ignored. With an empty
    /// schema the record's own keys are used, in order.
    pub fn coerce(&self, payload: &Map<String, Value>) -> Result<DataFrame> {
        let columns: Vec<Column> = if self.schema.is_empty() {
            payload
                .iter()
                .map(|(name, value)| json_cell(name, Some(value), CellKind::Numeric).into())
                .collect()
        } else {
            let numerical = self
                .schema
                .numerical
                .iter()
                .map(|name| json_cell(name, payload.get(name), CellKind::Numeric));
            let categorical = self
                .schema
                .categorical
                .iter()
                .map(|name| json_cell(name, payload.get(name), CellKind::Text));
            numerical.chain(categorical).map(Column::from).collect()
        };

        if columns.is_empty() {
            return Err(ServeError::InvalidInput(
                "no features supplied and the model declares none".to_string(),
            ));
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Feature matrix for a frame: transform, clip, then reject non-finite values
    pub fn features(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let mut x = match &self.transformer {
            Some(t) => t.transform(df)?,
            None => frame_to_matrix(df)?,
        };
        for clipper in &self.clippers {
            clipper.apply(&mut x);
        }

        if let Some((row, _)) = x
            .axis_iter(Axis(0))
            .enumerate()
            .find(|(_, r)| r.iter().any(|v| !v.is_finite()))
        {
            return Err(ServeError::InferenceError(format!(
                "Input contains NaN or infinity (row {})",
                row
            )));
        }
        Ok(x)
    }

    /// Score a feature matrix, in parallel chunks when it exceeds the batch size
    pub fn score(&self, x: &Array2<f64>) -> Result<Scored> {
        let batch_size = self.config.batch_size.max(1);
        if x.nrows() <= batch_size {
            return self.model.score(&x.view());
        }

        let chunks: Vec<ArrayView2<f64>> = x.axis_chunks_iter(Axis(0), batch_size).collect();
        let score_fn = |chunks: &[ArrayView2<f64>]| -> Result<Vec<Scored>> {
            chunks
                .par_iter()
                .map(|chunk| self.model.score(chunk))
                .collect::<Result<Vec<_>>>()
        };

        let parts = match &self.pool {
            Some(pool) => pool.install(|| score_fn(&chunks))?,
            None => score_fn(&chunks)?,
        };
        debug!(rows = x.nrows(), chunks = parts.len(), "Scored in parallel");

        let labels: Array1<i64> = parts
            .iter()
            .flat_map(|s| s.labels.iter().copied())
            .collect();
        let probabilities = self.model.has_probability().then(|| {
            parts
                .iter()
                .flat_map(|s| s.probabilities.iter().flatten().copied())
                .collect::<Array1<f64>>()
        });

        Ok(Scored {
            labels,
            probabilities,
        })
    }

    /// Predict a single JSON record
    pub fn predict_one(&self, payload: &Map<String, Value>) -> Result<PredictionResult> {
        let df = self.coerce(payload)?;
        let x = self.features(&df)?;
        let scored = self.model.score(&x.view())?;

        let prediction = scored
            .labels
            .first()
            .copied()
            .ok_or_else(|| ServeError::InferenceError("model returned no label".to_string()))?;
        let probability = scored.probabilities.and_then(|p| p.first().copied());

        Ok(PredictionResult {
            prediction,
            probability,
        })
    }

    /// Score every row of a table and append `pred` (and `proba` when available)
    pub fn predict_table(&self, mut df: DataFrame) -> Result<DataFrame> {
        if df.height() == 0 {
            return Err(ServeError::InvalidInput("CSV contains no data rows".to_string()));
        }

        let start = Instant::now();
        let x = self.features(&df)?;
        let scored = self.score(&x)?;

        df.with_column(Series::new(PRED_COLUMN.into(), scored.labels.to_vec()))?;
        if let Some(proba) = scored.probabilities {
            df.with_column(Series::new(PROBA_COLUMN.into(), proba.to_vec()))?;
        }

        debug!(
            rows = df.height(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Table scored"
        );
        Ok(df)
    }

    /// Score an uploaded CSV and render the preview and CSV output
    pub fn predict_batch_csv(&self, bytes: &[u8]) -> Result<BatchResult> {
        let df = DataLoader::new().read_csv_bytes(bytes)?;
        let mut scored = self.predict_table(df)?;

        let preview = preview_rows(&scored, self.config.preview_rows)?;
        let csv = DataSaver::to_csv_string(&mut scored)?;
        Ok(BatchResult { preview, csv })
    }
}

#[derive(Clone, Copy)]
enum CellKind {
    Numeric,
    Text,
}

/// One-row series for a JSON value; missing and null cells are typed by role
fn json_cell(name: &str, value: Option<&Value>, kind: CellKind) -> Series {
    match value {
        None | Some(Value::Null) => match kind {
            CellKind::Numeric => Series::new(name.into(), &[None::<f64>]),
            CellKind::Text => Series::new(name.into(), &[None::<&str>]),
        },
        Some(Value::Number(n)) => Series::new(name.into(), &[n.as_f64()]),
        Some(Value::String(s)) => Series::new(name.into(), &[Some(s.as_str())]),
        Some(Value::Bool(b)) => Series::new(name.into(), &[Some(*b)]),
        Some(nested) => Series::new(name.into(), &[Some(nested.to_string())]),
    }
}

/// First `n` rows as JSON objects keyed by column name
fn preview_rows(df: &DataFrame, n: usize) -> Result<Vec<Map<String, Value>>> {
    let columns = df.get_columns();
    (0..n.min(df.height()))
        .map(|i| {
            columns
                .iter()
                .map(|c| Ok((c.name().to_string(), any_value_to_json(c.get(i)?))))
                .collect::<Result<Map<String, Value>>>()
        })
        .collect()
}

fn any_value_to_json(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::Int32(v) => Value::from(v),
        AnyValue::Int64(v) => Value::from(v),
        AnyValue::UInt32(v) => Value::from(v),
        AnyValue::UInt64(v) => Value::from(v),
        AnyValue::Float32(v) => float_to_json(f64::from(v)),
        AnyValue::Float64(v) => float_to_json(v),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        other => Value::String(other.to_string()),
    }
}

fn float_to_json(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
