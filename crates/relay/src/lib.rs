/*!
 * Relay service: signed ingest, idempotent persistence, best-effort enqueue
 * to the delivery worker pool, and event search.
 */

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod request_id;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use relay_common::{EventStore, QueueClient};
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::Config;
use state::AppState;

/// Builds the full router. Shared by `main.rs` and the integration tests.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/metrics", get(handlers::health::metrics_handler))
        .route("/webhooks/ingest", post(handlers::ingest::ingest))
        .route("/webhooks/search", post(handlers::search::search))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id::bind_request_id))
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// Convenience constructor for integration tests that already have a live
/// store/queue (e.g. backed by `testcontainers`).
pub async fn build_state(config: Config) -> anyhow::Result<AppState> {
    let store = EventStore::connect(&config.mongodb_url, &config.mongodb_database).await?;
    let queue = QueueClient::connect(&config.redis_url).await?;

    Ok(AppState {
        store: Arc::new(store),
        queue: Arc::new(Mutex::new(queue)),
        config: Arc::new(config),
    })
}
