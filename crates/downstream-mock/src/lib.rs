/*!
 * Downstream mock: a rate-limited, probabilistically-failing HTTP receiver
 * used as a realistic end-to-end target for the delivery worker.
 */

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod rate_limiter;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use redis::aio::ConnectionManager;

use config::Config;
use handlers::AppState;
use rate_limiter::RateLimiter;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/downstream/receive", post(handlers::receive))
        .with_state(state)
}

pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let client = redis::Client::open(config.redis_url.as_str())?;
    let manager = ConnectionManager::new(client).await?;
    Ok(AppState {
        rate_limiter: Arc::new(RateLimiter::new(manager)),
    })
}
