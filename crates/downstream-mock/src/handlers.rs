use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use serde_json::{json, Value};
use tracing::info;

use crate::metrics;
use crate::rate_limiter::{extract_client_ip, RateLimiter};

const FAILURE_RATE: f64 = 0.20;

#[derive(Clone)]
pub struct AppState {
    pub rate_limiter: Arc<RateLimiter>,
}

#[derive(Clone, Copy)]
enum Outcome {
    InternalError,
    RateLimited,
    Timeout,
    Success,
}

fn draw_outcome() -> Outcome {
    let weights = [
        FAILURE_RATE * 0.5,
        FAILURE_RATE * 0.25,
        FAILURE_RATE * 0.25,
        1.0 - FAILURE_RATE,
    ];
    let outcomes = [
        Outcome::InternalError,
        Outcome::RateLimited,
        Outcome::Timeout,
        Outcome::Success,
    ];
    let dist = WeightedIndex::new(weights).expect("weights are non-negative and non-empty");
    outcomes[dist.sample(&mut thread_rng())]
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

pub async fn metrics_handler() -> Result<String, (StatusCode, String)> {
    metrics::render().map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

pub async fn receive(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok());
    let client_ip = extract_client_ip(forwarded_for, Some(&peer.ip().to_string()));

    if !state.rate_limiter.allow(&client_ip).await {
        info!(ip = %client_ip, "rate limited");
        metrics::DOWNSTREAM_RATE_LIMITED_TOTAL.inc();
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"detail": format!("Rate limit exceeded for IP {client_ip}")})),
        );
    }

    match draw_outcome() {
        Outcome::InternalError => {
            info!(ip = %client_ip, "injecting 500");
            metrics::DOWNSTREAM_REQUESTS_TOTAL
                .with_label_values(&["500"])
                .inc();
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": "Simulated internal error"})),
            )
        }
        Outcome::RateLimited => {
            info!(ip = %client_ip, "injecting 429");
            metrics::DOWNSTREAM_REQUESTS_TOTAL
                .with_label_values(&["429"])
                .inc();
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({"detail": "Simulated external rate limit"})),
            )
        }
        Outcome::Timeout => {
            let delay_sec = thread_rng().gen_range(2.0..5.0);
            info!(ip = %client_ip, delay_sec, "simulating timeout");
            metrics::DOWNSTREAM_REQUESTS_TOTAL
                .with_label_values(&["timeout"])
                .inc();
            tokio::time::sleep(Duration::from_secs_f64(delay_sec)).await;
            (
                StatusCode::OK,
                Json(json!({
                    "status": "received_with_delay",
                    "ip": client_ip,
                    "delay_sec": (delay_sec * 100.0).round() / 100.0,
                    "timestamp": Utc::now().timestamp(),
                })),
            )
        }
        Outcome::Success => {
            info!(ip = %client_ip, "received successfully");
            metrics::DOWNSTREAM_REQUESTS_TOTAL
                .with_label_values(&["success"])
                .inc();
            (
                StatusCode::OK,
                Json(json!({
                    "status": "received",
                    "ip": client_ip,
                    "timestamp": Utc::now().timestamp(),
                })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_outcome_never_panics_across_many_draws() {
        for _ in 0..1000 {
            let _ = draw_outcome();
        }
    }
}
