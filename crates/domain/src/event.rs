//! The event entity: the single persistent record this system manages.

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of an [`Event`].
///
/// Transitions form a DAG: `Received -> Delivering -> {Delivered, Received,
/// FailedPermanently}`. `Delivered` and `FailedPermanently` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Received,
    Delivering,
    Delivered,
    FailedPermanently,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventStatus::Received => "RECEIVED",
            EventStatus::Delivering => "DELIVERING",
            EventStatus::Delivered => "DELIVERED",
            EventStatus::FailedPermanently => "FAILED_PERMANENTLY",
        };
        f.write_str(s)
    }
}

/// Parses a status string from an external caller (e.g. the search endpoint).
///
/// Unlike the source this is modeled on, an unrecognized value is rejected
/// rather than passed through to the store untouched.
impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RECEIVED" => Ok(EventStatus::Received),
            "DELIVERING" => Ok(EventStatus::Delivering),
            "DELIVERED" => Ok(EventStatus::Delivered),
            "FAILED_PERMANENTLY" => Ok(EventStatus::FailedPermanently),
            other => Err(format!("unrecognized event status: {other}")),
        }
    }
}

/// One outbound delivery attempt, appended in order by `attempt_number`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt_number: u32,
    pub http_status_code: Option<u16>,
    pub success: bool,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
}

/// The event document as stored in the event store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// The producer-supplied payload, preserved verbatim. Never typed: it is
    /// arbitrary nested JSON and only `event_type`/`idempotency_key` are
    /// extracted from it for indexing.
    pub payload: serde_json::Value,

    pub event_type: Option<String>,
    pub idempotency_key: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub received_at: DateTime<Utc>,
    pub status: EventStatus,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime::option")]
    pub locked_at: Option<DateTime<Utc>>,
    pub delivery_attempts: Vec<AttemptRecord>,
}

impl Event {
    /// Builds a freshly ingested event: `status=RECEIVED`, no attempts yet.
    pub fn new_received(payload: serde_json::Value) -> Self {
        let event_type = payload
            .get("event_type")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let idempotency_key = payload
            .get("idempotency_key")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Self {
            id: None,
            payload,
            event_type,
            idempotency_key,
            received_at: Utc::now(),
            status: EventStatus::Received,
            locked_at: None,
            delivery_attempts: Vec::new(),
        }
    }
}

/// A flattened view of [`Event`] returned by the search endpoint, with `id`
/// and `received_at` rendered as strings for the wire.
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub id: String,
    pub payload: serde_json::Value,
    pub event_type: Option<String>,
    pub idempotency_key: Option<String>,
    pub received_at: String,
    pub status: EventStatus,
    pub delivery_attempts: Vec<AttemptRecord>,
}

impl From<Event> for EventView {
    fn from(event: Event) -> Self {
        Self {
            id: event
                .id
                .map(|id| id.to_hex())
                .unwrap_or_default(),
            payload: event.payload,
            event_type: event.event_type,
            idempotency_key: event.idempotency_key,
            received_at: event.received_at.to_rfc3339(),
            status: event.status,
            delivery_attempts: event.delivery_attempts,
        }
    }
}
