//! Prometheus metrics for the relay service.

use lazy_static::lazy_static;
use prometheus::{opts, register_int_counter, Encoder, IntCounter, TextEncoder};

lazy_static! {
    /// Incremented once per event successfully processed by the ingest
    /// pipeline (both newly inserted and idempotent replays).
    pub static ref WEBHOOKS_RECEIVED_TOTAL: IntCounter = register_int_counter!(opts!(
        "webhooks_received_total",
        "Total number of webhook events accepted by the ingest pipeline"
    ))
    .expect("metric can be created");
}

pub fn render() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
