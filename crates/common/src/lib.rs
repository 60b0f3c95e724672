//! Shared infrastructure used by every service: the event store, the
//! delivery queue client, HMAC helpers, error types, and logging setup.

pub mod auth;
pub mod error;
pub mod logging;
pub mod redis_client;
pub mod store;

pub use auth::{sign_hmac, verify_hmac};
pub use error::{Error, Result};
pub use logging::{init_tracing, init_tracing_json};
pub use redis_client::QueueClient;
pub use store::{EventFilter, EventStore, InsertOutcome};
