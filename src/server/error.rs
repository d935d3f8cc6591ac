//! Error types for the server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::ServeError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),

    /// Model could not be loaded; the message is shown to the caller
    #[error("{0}")]
    ModelUnavailable(String),

    /// Unexpected fault; details are logged, not returned
    #[error("{0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::ModelUnavailable(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ServeError> for ServerError {
    fn from(err: ServeError) -> Self {
        match err {
            e if e.is_client_error() => ServerError::BadRequest(e.to_string()),
            e @ (ServeError::ArtifactNotFound(_) | ServeError::InvalidArtifact(_)) => {
                ServerError::ModelUnavailable(e.to_string())
            }
            e => ServerError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ServerError::BadRequest(msg) => {
                tracing::debug!(detail = %msg, "Rejected request");
                msg
            }
            ServerError::ModelUnavailable(msg) => {
                tracing::error!(detail = %msg, "Model unavailable");
                msg
            }
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                "An internal error occurred".to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
