//! Shared, lazily-loaded prediction service

use crate::error::{Result, ServeError};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

use super::engine::{BatchResult, InferenceEngine, PredictionResult};
use super::schema::FeatureSchema;
use super::InferenceConfig;

/// Loads the model artifact on first use and serves predictions from it.
///
/// The engine is stored once behind a `OnceCell`: concurrent first callers
/// wait on a single load, and a failed load leaves the cell empty so the
/// next call tries again. After a successful load the engine is never replaced.
#[derive(Debug)]
pub struct PredictionService {
    model_path: PathBuf,
    config: InferenceConfig,
    engine: OnceCell<Arc<InferenceEngine>>,
}

impl PredictionService {
    pub fn new(model_path: impl Into<PathBuf>, config: InferenceConfig) -> Self {
        Self {
            model_path: model_path.into(),
            config,
            engine: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.initialized()
    }

    /// Return the engine, loading the artifact if this is the first successful call
    pub async fn ensure_loaded(&self) -> Result<Arc<InferenceEngine>> {
        self.engine
            .get_or_try_init(|| async {
                let path = self.model_path.clone();
                let config = self.config.clone();
                debug!(path = %path.display(), "Loading model artifact");

                let engine = tokio::task::spawn_blocking(move || InferenceEngine::load(&path, config))
                    .await
                    .map_err(|e| ServeError::Internal(format!("model load task failed: {}", e)))??;
                Ok::<_, ServeError>(Arc::new(engine))
            })
            .await
            .map(Arc::clone)
    }

    /// Feature schema of the loaded model; empty when it could not be derived
    pub async fn get_schema(&self) -> Result<FeatureSchema> {
        Ok(self.ensure_loaded().await?.schema().clone())
    }

    /// Name of the predicted target
    pub async fn get_target(&self) -> Result<String> {
        Ok(self.ensure_loaded().await?.target().to_string())
    }

    /// Predict a single record
    pub async fn predict_one(&self, payload: Map<String, Value>) -> Result<PredictionResult> {
        let engine = self.ensure_loaded().await?;
        engine.predict_one(&payload)
    }

    /// Predict every row of an uploaded CSV
    pub async fn predict_batch(&self, bytes: Vec<u8>) -> Result<BatchResult> {
        let engine = self.ensure_loaded().await?;
        tokio::task::spawn_blocking(move || engine.predict_batch_csv(&bytes))
            .await
            .map_err(|e| ServeError::Internal(format!("batch prediction task failed: {}", e)))?
    }
}
