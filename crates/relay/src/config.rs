use anyhow::{Context, Result};
use std::env;

/// Configuration for the relay service, loaded once at start.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,

    pub mongodb_url: String,
    pub mongodb_database: String,

    pub redis_url: String,
    pub delivery_queue_name: String,

    /// Shared HMAC secret used to verify `X-Signature` on ingest requests.
    pub secret_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server_host: env::var("RELAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("RELAY_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .context("RELAY_PORT must be a valid port number")?,

            mongodb_url: env::var("MONGODB_URL").context("MONGODB_URL must be set")?,
            mongodb_database: env::var("MONGODB_DATABASE")
                .unwrap_or_else(|_| "webhook_relay".to_string()),

            redis_url: env::var("REDIS_URL").context("REDIS_URL must be set")?,
            delivery_queue_name: env::var("DELIVERY_QUEUE_NAME")
                .unwrap_or_else(|_| "delivery_queue".to_string()),

            secret_key: env::var("SECRET_KEY").context("SECRET_KEY must be set")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        unsafe {
            env::set_var("MONGODB_URL", "mongodb://localhost:27017");
            env::set_var("REDIS_URL", "redis://localhost:6379");
            env::set_var("SECRET_KEY", "test-secret");
            env::remove_var("RELAY_HOST");
            env::remove_var("RELAY_PORT");
        }

        let config = Config::from_env().unwrap();
        assert_eq!(config.server_host, "0.0.0.0");
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.delivery_queue_name, "delivery_queue");
    }
}
