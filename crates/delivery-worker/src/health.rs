use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router};
use axum::routing::get;
use serde_json::{json, Value};

/// Shared readiness state, flipped once the worker pool has finished its
/// initial barrier sync and is actively dequeuing jobs.
#[derive(Clone)]
pub struct ServiceState {
    pub ready: Arc<AtomicBool>,
    pub workers_initialized: Arc<AtomicUsize>,
    pub worker_count: usize,
}

pub fn router(state: ServiceState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "delivery-worker",
    }))
}

async fn ready(State(state): State<ServiceState>) -> (StatusCode, Json<Value>) {
    let is_ready = state.ready.load(Ordering::SeqCst);
    let workers_init = state.workers_initialized.load(Ordering::SeqCst);

    if is_ready {
        (
            StatusCode::OK,
            Json(json!({
                "ready": true,
                "workers_initialized": workers_init,
                "workers_total": state.worker_count,
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "ready": false,
                "workers_initialized": workers_init,
                "workers_total": state.worker_count,
            })),
        )
    }
}

async fn metrics() -> Result<String, (StatusCode, String)> {
    crate::metrics::render().map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
