//! The delivery job handed from the ingest handler to the worker pool.

use serde::{Deserialize, Serialize};

/// A unit of work on the delivery queue: `(event_id, request_id?)`.
///
/// `event_id` is the hex string form of the event's store-assigned id, not a
/// typed identifier, because it crosses a queue as plain JSON text and must
/// still be handled gracefully if malformed (see the worker's id validation
/// step).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryJob {
    pub event_id: String,
    pub request_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_job_roundtrips_through_json() {
        let job = DeliveryJob {
            event_id: "abc123".to_string(),
            request_id: Some("req-1".to_string()),
        };

        let json = serde_json::to_string(&job).unwrap();
        let parsed: DeliveryJob = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.event_id, job.event_id);
        assert_eq!(parsed.request_id, job.request_id);
    }
}
