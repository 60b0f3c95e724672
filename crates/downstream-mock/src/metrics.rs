//! Prometheus metrics for the downstream mock. Exposed on `/metrics`.

use lazy_static::lazy_static;
use prometheus::{
    opts, register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    /// Every request that reached outcome injection, by the outcome drawn.
    pub static ref DOWNSTREAM_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        opts!(
            "downstream_requests_total",
            "Total number of requests handled, by injected outcome"
        ),
        &["outcome"]
    )
    .expect("metric can be created");

    /// Requests rejected by the rate limiter before outcome injection.
    pub static ref DOWNSTREAM_RATE_LIMITED_TOTAL: IntCounter = register_int_counter!(
        "downstream_rate_limited_total",
        "Total number of requests rejected by the rate limiter"
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
