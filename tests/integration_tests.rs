/*!
 * Integration tests for the store and HMAC layers in isolation.
 *
 * These exercise `relay-common` directly against a live MongoDB and Redis —
 * no HTTP server, no worker pool. For the full signed-ingest-to-delivered
 * pipeline, see `e2e_tests.rs`.
 *
 * Requirements:
 * - MongoDB reachable at `$MONGODB_URL` (default mongodb://localhost:27017)
 * - Redis reachable at `$REDIS_URL` (default redis://localhost:6379)
 *
 * Run with: cargo test --test integration_tests -- --ignored
 */

use chrono::Utc;
use relay_common::auth::{sign_hmac, verify_hmac};
use relay_common::{EventFilter, EventStore, InsertOutcome, QueueClient};
use relay_domain::{DeliveryJob, Event, EventStatus};
use serde_json::json;
use serial_test::serial;

fn test_mongodb_url() -> String {
    std::env::var("MONGODB_URL").unwrap_or_else(|_| "mongodb://localhost:27017".to_string())
}

fn test_redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

async fn test_store() -> EventStore {
    EventStore::connect(&test_mongodb_url(), "relay_integration_tests")
        .await
        .expect("failed to connect to test MongoDB")
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_insert_then_find_by_id() {
    let store = test_store().await;
    let event = Event::new_received(json!({"event_type": "order.created", "order_id": 1}));

    let outcome = store.insert(event).await.expect("insert failed");
    let inserted = match outcome {
        InsertOutcome::Inserted(e) => e,
        InsertOutcome::IdempotentReplay(_) => panic!("expected a fresh insert"),
    };

    let id = inserted.id.expect("inserted event must carry an id");
    let found = store.find_by_id(id).await.unwrap().expect("event must be found");
    assert_eq!(found.event_type.as_deref(), Some("order.created"));
    assert_eq!(found.status, EventStatus::Received);
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_idempotency_key_collision_returns_existing_document() {
    let store = test_store().await;
    let key = format!("integration-test-key-{}", Utc::now().timestamp_nanos_opt().unwrap());

    let first = Event::new_received(json!({"idempotency_key": key, "n": 1}));
    let second = Event::new_received(json!({"idempotency_key": key, "n": 2}));

    let first_id = match store.insert(first).await.unwrap() {
        InsertOutcome::Inserted(e) => e.id.unwrap(),
        InsertOutcome::IdempotentReplay(_) => panic!("first insert must not be a replay"),
    };

    let replay = store.insert(second).await.unwrap();
    match replay {
        InsertOutcome::IdempotentReplay(existing) => {
            assert_eq!(existing.id.unwrap(), first_id);
        }
        InsertOutcome::Inserted(_) => panic!("duplicate idempotency_key must not insert a second document"),
    }
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_claim_is_exclusive() {
    let store = test_store().await;
    let event = Event::new_received(json!({"event_type": "claim.test"}));
    let id = match store.insert(event).await.unwrap() {
        InsertOutcome::Inserted(e) => e.id.unwrap(),
        _ => unreachable!(),
    };

    let first_claim = store.claim(id).await.unwrap();
    assert!(first_claim.is_some());

    let second_claim = store.claim(id).await.unwrap();
    assert!(second_claim.is_none(), "a second claim on the same event must fail");
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_search_filters_by_status_and_event_type() {
    let store = test_store().await;
    let marker = format!("search-test-{}", Utc::now().timestamp_nanos_opt().unwrap());

    let event = Event::new_received(json!({"event_type": marker.clone()}));
    store.insert(event).await.unwrap();

    let filter = EventFilter {
        status: Some(EventStatus::Received),
        event_type: Some(marker.clone()),
        from_timestamp: None,
        to_timestamp: None,
    };

    let (data, summary) = store.search(&filter, 0, 10).await.unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(summary.event_type_counts.get(&marker), Some(&1));
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_queue_enqueue_and_dequeue_roundtrip() {
    let mut client = QueueClient::connect(&test_redis_url()).await.unwrap();
    let job = DeliveryJob {
        event_id: "507f1f77bcf86cd799439011".to_string(),
        request_id: Some("integration-test".to_string()),
    };

    client.enqueue("relay_integration_tests:queue", &job).await.unwrap();
    let dequeued = client
        .dequeue("relay_integration_tests:queue", 2)
        .await
        .unwrap()
        .expect("job must be present");

    assert_eq!(dequeued.event_id, job.event_id);
}

#[test]
fn test_hmac_verifies_exact_bytes_only() {
    let secret = "integration-test-secret";
    let body = br#"{"event_type":"order.created"}"#;
    let signature = sign_hmac(body, secret);

    assert!(verify_hmac(body, &signature, secret));

    let mut tampered = body.to_vec();
    tampered[0] = b'[';
    assert!(!verify_hmac(&tampered, &signature, secret));

    let bad_signature = "00".repeat(32);
    assert!(!verify_hmac(body, &bad_signature, secret));
}
