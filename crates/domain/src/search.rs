//! Request/response types for the event search endpoint.

use crate::event::EventView;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_limit() -> i64 {
    10
}

/// Filter parameters accepted by `POST /webhooks/search`. All fields are
/// ANDed together; timestamp filters apply to `received_at`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub status: Option<String>,
    pub event_type: Option<String>,
    pub from_timestamp: Option<chrono::DateTime<chrono::Utc>>,
    pub to_timestamp: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// One bucket of the hourly delivery histogram, `_id` formatted
/// `"YYYY-MM-DD HH:00"` and sorted ascending by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramBucket {
    #[serde(rename = "_id")]
    pub bucket: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchSummary {
    pub status_counts: HashMap<String, i64>,
    pub event_type_counts: HashMap<String, i64>,
    pub hourly_histogram: Vec<HistogramBucket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub data: Vec<EventView>,
    pub summary: SearchSummary,
}
