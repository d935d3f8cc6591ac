//! Request handlers

use std::sync::Arc;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::inference::{BatchResult, PredictionResult};

use super::error::{Result, ServerError};
use super::state::AppState;

/// Multipart field carrying the batch CSV
pub const UPLOAD_FIELD: &str = "file";

/// Liveness probe; never touches the model
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let uptime = chrono::Utc::now().signed_duration_since(state.started_at);
    debug!(
        uptime_secs = uptime.num_seconds(),
        model_loaded = state.service.is_loaded(),
        "Health check"
    );
    Json(json!({ "ok": true }))
}

/// Input schema of the loaded model
pub async fn get_schema(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let schema = state.service.get_schema().await?;
    let target = state.service.get_target().await?;

    Ok(Json(json!({
        "features": {
            "numerical": schema.numerical,
            "categorical": schema.categorical,
        },
        "target": target,
    })))
}

/// Predict a single JSON record
pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PredictionResult>> {
    // A missing model outranks a malformed request
    state.service.ensure_loaded().await?;
    let payload = parse_record(&body)?;
    debug!(fields = payload.len(), "Predict request");

    let result = state.service.predict_one(payload).await.map_err(|e| {
        warn!(error = %e, "Prediction failed");
        ServerError::from(e)
    })?;
    Ok(Json(result))
}

/// Predict every row of an uploaded CSV
pub async fn predict_batch(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<BatchResult>> {
    state.service.ensure_loaded().await?;
    let mut multipart = multipart.map_err(|e| ServerError::BadRequest(missing_upload(&e)))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.csv").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(e.body_text()))?;
        info!(file = %file_name, bytes = data.len(), "Received batch upload");
        upload = Some(data);
        break;
    }

    let data = upload.ok_or_else(|| ServerError::BadRequest(missing_upload(&"no such field")))?;
    let result = state.service.predict_batch(data.to_vec()).await.map_err(|e| {
        warn!(error = %e, "Batch prediction failed");
        ServerError::from(e)
    })?;
    Ok(Json(result))
}

fn missing_upload(detail: &dyn std::fmt::Display) -> String {
    debug!(detail = %detail, "Upload field missing");
    format!("Upload a CSV file as form field '{}'", UPLOAD_FIELD)
}

/// Parse a request body that must be a JSON object
fn parse_record(body: &[u8]) -> Result<Map<String, Value>> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ServerError::BadRequest(format!("Invalid JSON body: {}", e)))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ServerError::BadRequest(format!(
            "Expected a JSON object of feature values, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
