use axum::body::Bytes;
use axum::extract::{Extension, State};
use axum::http::HeaderMap;
use axum::Json;
use relay_common::InsertOutcome;
use relay_domain::{DeliveryJob, Event};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::AppError;
use crate::metrics;
use crate::request_id::RequestId;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct IngestResult {
    pub status: &'static str,
    pub event_id: String,
    pub idempotent: bool,
}

/// `POST /webhooks/ingest`
///
/// Verifies the HMAC signature over the raw body, normalizes the payload
/// into a batch, and inserts each event independently. One event's store
/// failure aborts the whole batch with 500 (see the batch propagation note);
/// an idempotent replay never fails the batch.
pub async fn ingest(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Vec<IngestResult>>, AppError> {
    let signature = headers
        .get("x-signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Validation("missing X-Signature header".to_string()))?;

    if !relay_common::verify_hmac(&body, signature, &state.config.secret_key) {
        return Err(AppError::Unauthorized("signature verification failed".to_string()));
    }

    let root: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("malformed JSON body: {e}")))?;

    let batch: Vec<serde_json::Value> = match root {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };

    let mut results = Vec::with_capacity(batch.len());
    for payload in batch {
        let event = Event::new_received(payload);
        let outcome = state.store.insert(event).await?;

        let result = match outcome {
            InsertOutcome::Inserted(event) => {
                let id = event.id.expect("inserted event carries an assigned id");
                enqueue_best_effort(&state, id.to_hex(), request_id.0.clone()).await;
                metrics::WEBHOOKS_RECEIVED_TOTAL.inc();
                IngestResult {
                    status: "received",
                    event_id: id.to_hex(),
                    idempotent: false,
                }
            }
            InsertOutcome::IdempotentReplay(event) => {
                let id = event.id.expect("stored event carries an assigned id");
                metrics::WEBHOOKS_RECEIVED_TOTAL.inc();
                info!(event_id = %id, "idempotent replay, no delivery job enqueued");
                IngestResult {
                    status: "received",
                    event_id: id.to_hex(),
                    idempotent: true,
                }
            }
        };

        results.push(result);
    }

    Ok(Json(results))
}

/// Enqueues the delivery job without letting a queue failure affect the HTTP
/// response — the event remains `RECEIVED` and can be picked up later.
async fn enqueue_best_effort(state: &AppState, event_id: String, request_id: String) {
    let job = DeliveryJob {
        event_id: event_id.clone(),
        request_id: Some(request_id),
    };

    let mut queue = state.queue.lock().await;
    if let Err(e) = queue.enqueue(&state.config.delivery_queue_name, &job).await {
        warn!(event_id = %event_id, error = %e, "failed to enqueue delivery job; event remains RECEIVED");
    }
}
