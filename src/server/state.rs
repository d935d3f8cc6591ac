//! Application state management

use crate::inference::{InferenceConfig, PredictionService};

use super::ServerConfig;

/// Application state shared across handlers
#[derive(Debug)]
pub struct AppState {
    pub config: ServerConfig,
    pub service: PredictionService,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// State whose model is loaded lazily from `config.model_path`
    pub fn new(config: ServerConfig) -> Self {
        let service = PredictionService::new(&config.model_path, InferenceConfig::from_env());
        Self::with_service(config, service)
    }

    pub fn with_service(config: ServerConfig, service: PredictionService) -> Self {
        Self {
            config,
            service,
            started_at: chrono::Utc::now(),
        }
    }
}
