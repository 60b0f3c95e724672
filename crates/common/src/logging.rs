//! Structured logging setup.
//!
//! Two initializers: a compact human-readable layer for local development and
//! a JSON layer for production log aggregation. Both read the level filter
//! from `RUST_LOG`, defaulting to `info`.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize compact console logging.
///
/// ```no_run
/// relay_common::init_tracing();
/// tracing::info!("server starting");
/// ```
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true)
                .compact(),
        )
        .init();
}

/// Initialize JSON logging, one object per line, suitable for log shipping.
pub fn init_tracing_json() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_level(true)
                .with_current_span(true),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::info;

    #[test]
    fn test_tracing_init_does_not_panic() {
        let _ = std::panic::catch_unwind(init_tracing);
        info!("test log message");
    }
}
