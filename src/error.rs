//! Error types for the satisfaction inference service

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, ServeError>;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum ServeError {
    #[error("model not found at {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("Invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("Schema derivation failed: {0}")]
    SchemaDerivation(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Inference error: {0}")]
    InferenceError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServeError {
    /// Whether the failure was caused by the request rather than the service.
    ///
    /// Artifact loading problems and internal faults are server-side; everything
    /// that happens while shaping or scoring a request is the caller's.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            ServeError::ArtifactNotFound(_)
                | ServeError::InvalidArtifact(_)
                | ServeError::IoError(_)
                | ServeError::SerializationError(_)
                | ServeError::Internal(_)
        )
    }
}

impl From<polars::error::PolarsError> for ServeError {
    fn from(err: polars::error::PolarsError) -> Self {
        ServeError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for ServeError {
    fn from(err: serde_json::Error) -> Self {
        ServeError::SerializationError(err.to_string())
    }
}
