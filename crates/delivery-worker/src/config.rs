use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub mongodb_url: String,
    pub mongodb_database: String,

    pub redis_url: String,
    pub delivery_queue_name: String,

    /// Where the worker POSTs event payloads.
    pub downstream_url: String,

    pub worker_count: usize,
    pub http_timeout: Duration,

    pub health_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            mongodb_url: env::var("MONGODB_URL").context("MONGODB_URL must be set")?,
            mongodb_database: env::var("MONGODB_DATABASE")
                .unwrap_or_else(|_| "webhook_relay".to_string()),

            redis_url: env::var("REDIS_URL").context("REDIS_URL must be set")?,
            delivery_queue_name: env::var("DELIVERY_QUEUE_NAME")
                .unwrap_or_else(|_| "delivery_queue".to_string()),

            downstream_url: env::var("DOWNSTREAM_URL").context("DOWNSTREAM_URL must be set")?,

            worker_count: env::var("WORKER_COUNT")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("WORKER_COUNT must be a valid number")?,
            http_timeout: Duration::from_secs(
                env::var("DELIVERY_HTTP_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .context("DELIVERY_HTTP_TIMEOUT_SECS must be a valid number")?,
            ),

            health_port: env::var("DELIVERY_HEALTH_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("DELIVERY_HEALTH_PORT must be a valid port number")?,
        })
    }
}

/// Maximum delivery attempts per event (spec-fixed, not configurable).
pub const MAX_ATTEMPTS: u32 = 5;

/// Inter-attempt backoff, in whole seconds, indexed by `attempt_number - 1`.
/// Fixed by contract (see TESTABLE PROPERTIES S5) — no jitter.
pub const BACKOFF_SECS: [u64; 5] = [1, 2, 4, 8, 16];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule_matches_spec() {
        assert_eq!(BACKOFF_SECS, [1, 2, 4, 8, 16]);
        assert_eq!(BACKOFF_SECS.iter().sum::<u64>(), 31);
    }

    #[test]
    fn test_config_defaults() {
        unsafe {
            env::set_var("MONGODB_URL", "mongodb://localhost:27017");
            env::set_var("REDIS_URL", "redis://localhost:6379");
            env::set_var("DOWNSTREAM_URL", "http://localhost:9000/downstream/receive");
            env::remove_var("WORKER_COUNT");
        }

        let config = Config::from_env().unwrap();
        assert_eq!(config.worker_count, 10);
        assert_eq!(config.http_timeout, Duration::from_secs(10));
    }
}
