//! Prometheus metrics for the delivery worker pool. Exposed on `/metrics`.

use lazy_static::lazy_static;
use prometheus::{
    opts, register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    /// Every delivery attempt that returned HTTP 200.
    pub static ref DELIVERIES_SUCCESSFUL_TOTAL: IntCounter = register_int_counter!(
        "webhooks_deliveries_successful_total",
        "Total number of delivery attempts that succeeded"
    )
    .expect("metric can be created");

    /// Every delivery attempt that did not return HTTP 200 (includes timeouts
    /// and connection errors), counted once per attempt, not once per event.
    pub static ref DELIVERIES_FAILED_TOTAL: IntCounter = register_int_counter!(
        "webhooks_deliveries_failed_total",
        "Total number of delivery attempts that failed"
    )
    .expect("metric can be created");

    /// Retry attempts scheduled after a non-final failure (excludes the
    /// first attempt of each event).
    pub static ref RETRY_ATTEMPTS_TOTAL: IntCounter = register_int_counter!(
        "webhooks_retry_attempts_total",
        "Total number of retry attempts scheduled after a failed delivery"
    )
    .expect("metric can be created");

    /// Events that exhausted all attempts without a success.
    pub static ref DELIVERIES_PERMANENTLY_FAILED_TOTAL: IntCounter = register_int_counter!(
        "webhook_deliveries_permanently_failed_total",
        "Total number of events that exhausted all delivery attempts"
    )
    .expect("metric can be created");

    /// Jobs dropped because the atomic claim returned no document: another
    /// worker already claimed the event, or it was no longer RECEIVED.
    pub static ref CLAIM_MISSES_TOTAL: IntCounter = register_int_counter!(
        "webhook_delivery_claim_misses_total",
        "Total number of dequeued jobs dropped because the claim found nothing to deliver"
    )
    .expect("metric can be created");

    /// HTTP status codes observed from the downstream, by class.
    pub static ref DOWNSTREAM_RESPONSES_TOTAL: IntCounterVec = register_int_counter_vec!(
        opts!(
            "webhook_downstream_responses_total",
            "Total downstream HTTP responses observed, by status code"
        ),
        &["status_code"]
    )
    .expect("metric can be created");

    /// Wall time of a single delivery attempt, start of the HTTP call to
    /// completion of the response (or error).
    pub static ref DELIVERY_ATTEMPT_DURATION: Histogram = register_histogram!(
        "webhook_delivery_attempt_duration_seconds",
        "Duration of a single outbound delivery attempt in seconds",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("metric can be created");

    /// Current depth of the delivery queue, polled on a timer by a dedicated
    /// connection rather than derived from per-job counters.
    pub static ref QUEUE_DEPTH: IntGauge = register_int_gauge!(
        "webhook_delivery_queue_depth",
        "Current number of jobs waiting in the delivery queue"
    )
    .expect("metric can be created");
}

pub fn render() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
