use std::sync::Arc;

use relay_common::{EventStore, QueueClient};
use tokio::sync::Mutex;

use crate::config::Config;

/// Shared state handed to every handler.
///
/// The queue client is behind a [`Mutex`] because `redis::aio::ConnectionManager`
/// requires `&mut self` for commands; handlers only hold the lock for the
/// duration of a single `LPUSH`, never across the downstream HTTP call.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<EventStore>,
    pub queue: Arc<Mutex<QueueClient>>,
    pub config: Arc<Config>,
}

impl axum::extract::FromRef<AppState> for Arc<Config> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
