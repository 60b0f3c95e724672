use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub redis_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            host: env::var("DOWNSTREAM_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("DOWNSTREAM_PORT")
                .unwrap_or_else(|_| "9000".to_string())
                .parse()
                .context("DOWNSTREAM_PORT must be a valid port number")?,
            redis_url: env::var("REDIS_URL").context("REDIS_URL must be set")?,
        })
    }
}
