//! Error types shared by every service in the workspace.
//!
//! Mirrors a typical exception hierarchy, but expressed as a closed Rust enum
//! so handler boundaries can match on error *kind* rather than catch broadly.

use thiserror::Error;

/// The error taxonomy used across ingest, delivery, and the downstream mock.
#[derive(Debug, Error)]
pub enum Error {
    /// Document store errors (MongoDB).
    #[error("store error: {0}")]
    Store(#[from] mongodb::error::Error),

    /// Key-value store errors (Redis) — rate limiter failures are handled
    /// fail-open at the call site and never reach this variant.
    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Outbound HTTP errors when talking to the downstream endpoint.
    #[error("downstream transport error: {0}")]
    Downstream(#[from] reqwest::Error),

    /// JSON (de)serialization errors.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request validation failures: missing/bad signature, malformed body,
    /// invalid search parameters. Always surfaced as 4xx.
    #[error("validation error: {0}")]
    Validation(String),

    /// A unique-index collision on `idempotency_key` whose existing document
    /// could not be found by a follow-up lookup. Always a bug or a race with
    /// an external deletion; surfaced as 500.
    #[error("logical inconsistency: {0}")]
    LogicalInconsistency(String),

    /// Configuration errors (missing/invalid environment variables).
    #[error("configuration error: {0}")]
    Config(String),

    /// Anything else, wrapped with context.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Result type alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;
