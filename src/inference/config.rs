//! Inference configuration

use serde::{Deserialize, Serialize};

/// Configuration for model inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Rows scored per chunk; larger tables are split and scored in parallel
    pub batch_size: usize,

    /// Number of parallel workers (defaults to the rayon global pool)
    pub n_workers: Option<usize>,

    /// Rows returned in a batch preview
    pub preview_rows: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            n_workers: None,
            preview_rows: 5,
        }
    }
}

impl InferenceConfig {
    /// Create a new inference configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set batch size
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Builder method to set number of workers
    pub fn with_n_workers(mut self, n: usize) -> Self {
        self.n_workers = Some(n);
        self
    }

    /// Builder method to set the preview length of batch results
    pub fn with_preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = rows;
        self
    }

    /// Defaults overridden by `INFERENCE_BATCH_SIZE`, `INFERENCE_WORKERS`
    /// and `PREVIEW_ROWS`
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |key: &str| var(key).and_then(|v| v.trim().parse::<usize>().ok());

        let mut config = Self::new();
        if let Some(size) = parsed("INFERENCE_BATCH_SIZE") {
            config = config.with_batch_size(size);
        }
        if let Some(n) = parsed("INFERENCE_WORKERS").filter(|n| *n > 0) {
            config = config.with_n_workers(n);
        }
        if let Some(rows) = parsed("PREVIEW_ROWS") {
            config = config.with_preview_rows(rows);
        }
        config
    }
}
