//! The retry-loop algorithm: claim an event, POST it to the downstream
//! receiver up to [`MAX_ATTEMPTS`] times with fixed backoff, and record the
//! outcome of every attempt.

use std::time::{Duration, Instant};

use bson::oid::ObjectId;
use chrono::Utc;
use relay_common::EventStore;
use relay_domain::{AttemptRecord, DeliveryJob, EventStatus};
use tracing::{info_span, warn, Instrument};

use crate::config::{BACKOFF_SECS, MAX_ATTEMPTS};
use crate::metrics;

/// Process one dequeued job to completion (claim, retry loop, terminal
/// write). Errors surfaced here are store/transport errors unrelated to the
/// business outcome of the delivery itself — the caller logs and moves on to
/// the next job rather than treating them as fatal to the worker.
pub async fn handle_job(
    worker_id: usize,
    job: DeliveryJob,
    store: &EventStore,
    http_client: &reqwest::Client,
    downstream_url: &str,
) -> anyhow::Result<()> {
    let span = info_span!(
        "delivery_job",
        worker_id,
        event_id = %job.event_id,
        request_id = job.request_id.as_deref().unwrap_or("none"),
    );

    async move {
        let Ok(id) = ObjectId::parse_str(&job.event_id) else {
            warn!("dropping job with malformed event_id");
            metrics::DELIVERIES_FAILED_TOTAL.inc();
            return Ok(());
        };

        let Some(event) = store.claim(id).await? else {
            metrics::CLAIM_MISSES_TOTAL.inc();
            warn!("claim missed: event already claimed or no longer deliverable");
            return Ok(());
        };

        let body = serde_json::to_vec(&event.payload)?;

        for attempt_number in 1..=MAX_ATTEMPTS {
            let started_at = Instant::now();
            let outcome = attempt_delivery(http_client, downstream_url, &body).await;
            metrics::DELIVERY_ATTEMPT_DURATION.observe(started_at.elapsed().as_secs_f64());

            let (success, status_code) = match &outcome {
                Ok(status) => (*status == 200, Some(*status)),
                Err(_) => (false, None),
            };

            if let Some(status) = status_code {
                metrics::DOWNSTREAM_RESPONSES_TOTAL
                    .with_label_values(&[&status.to_string()])
                    .inc();
            }

            let record = AttemptRecord {
                attempt_number,
                http_status_code: status_code,
                success,
                timestamp: Utc::now(),
            };

            if success {
                store
                    .record_attempt(id, record, EventStatus::Delivered)
                    .await?;
                metrics::DELIVERIES_SUCCESSFUL_TOTAL.inc();
                return Ok(());
            }

            store
                .record_attempt(id, record, EventStatus::Received)
                .await?;
            metrics::DELIVERIES_FAILED_TOTAL.inc();

            if let Err(err) = &outcome {
                warn!(attempt_number, error = %err, "delivery attempt failed");
            } else {
                warn!(attempt_number, status = status_code, "delivery attempt rejected");
            }

            if attempt_number < MAX_ATTEMPTS {
                metrics::RETRY_ATTEMPTS_TOTAL.inc();
                let backoff = BACKOFF_SECS[(attempt_number - 1) as usize];
                tokio::time::sleep(Duration::from_secs(backoff)).await;
            }
        }

        store.set_status(id, EventStatus::FailedPermanently).await?;
        metrics::DELIVERIES_PERMANENTLY_FAILED_TOTAL.inc();
        warn!("event exhausted all delivery attempts, marked FAILED_PERMANENTLY");

        Ok(())
    }
    .instrument(span)
    .await
}

/// POST the raw event payload to the downstream receiver. Returns the HTTP
/// status code on any completed response (including non-200 ones); network
/// errors and timeouts are propagated as `Err`.
async fn attempt_delivery(
    http_client: &reqwest::Client,
    downstream_url: &str,
    body: &[u8],
) -> anyhow::Result<u16> {
    let response = http_client
        .post(downstream_url)
        .header("content-type", "application/json")
        .body(body.to_vec())
        .send()
        .await?;
    Ok(response.status().as_u16())
}
