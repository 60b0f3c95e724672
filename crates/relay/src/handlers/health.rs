use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::error::AppError;
use crate::metrics;
use crate::state::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

pub async fn metrics_handler(State(_state): State<AppState>) -> Result<String, AppError> {
    metrics::render().map_err(|e| AppError::Internal(e.to_string()))
}
