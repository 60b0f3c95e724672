/*!
 * End-to-end scenarios S1-S6 from the relay's external contract: signed
 * ingest through a real router, delivery through the worker's retry loop
 * against a `wiremock` stand-in for the downstream receiver, and the
 * downstream mock's own rate limiter against a live Redis.
 *
 * Requirements:
 * - MongoDB reachable at `$MONGODB_URL` (default mongodb://localhost:27017)
 * - Redis reachable at `$REDIS_URL` (default redis://localhost:6379)
 *
 * Run with: cargo test --test e2e_tests -- --ignored
 */

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bson::oid::ObjectId;
use chrono::Utc;
use relay::config::Config as RelayConfig;
use relay::state::AppState;
use relay_common::auth::sign_hmac;
use relay_common::{EventStore, QueueClient};
use relay_domain::EventStatus;
use serde_json::{json, Value};
use serial_test::serial;
use tokio::sync::Mutex;
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "e2e-test-secret";

fn test_mongodb_url() -> String {
    std::env::var("MONGODB_URL").unwrap_or_else(|_| "mongodb://localhost:27017".to_string())
}

fn test_redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

async fn test_relay_state(database: &str) -> AppState {
    let store = EventStore::connect(&test_mongodb_url(), database).await.unwrap();
    let queue = QueueClient::connect(&test_redis_url()).await.unwrap();
    let config = RelayConfig {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        mongodb_url: test_mongodb_url(),
        mongodb_database: database.to_string(),
        redis_url: test_redis_url(),
        delivery_queue_name: format!("{database}:queue"),
        secret_key: SECRET.to_string(),
    };

    AppState {
        store: Arc::new(store),
        queue: Arc::new(Mutex::new(queue)),
        config: Arc::new(config),
    }
}

async fn post_ingest(app: axum::Router, body: &[u8], signature: Option<String>) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method("POST")
        .uri("/webhooks/ingest")
        .header("content-type", "application/json");
    if let Some(sig) = signature {
        request = request.header("x-signature", sig);
    }
    let request = request.body(Body::from(body.to_vec())).unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn deliver_one(store: &EventStore, queue: &mut QueueClient, queue_name: &str, downstream_url: &str) {
    let job = queue
        .dequeue(queue_name, 5)
        .await
        .unwrap()
        .expect("a job must be enqueued for delivery");
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();
    delivery_worker::worker::handle_job(0, job, store, &http_client, downstream_url)
        .await
        .unwrap();
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_s1_single_event_happy_path() {
    let downstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&downstream)
        .await;

    let state = test_relay_state("relay_e2e_s1").await;
    let store = Arc::clone(&state.store);
    let queue_for_worker = Arc::clone(&state.queue);
    let queue_name = state.config.delivery_queue_name.clone();
    let app = relay::create_router(state);

    let body = json!({"event_type": "order.created", "idempotency_key": "s1-key", "data": {}});
    let body_bytes = serde_json::to_vec(&body).unwrap();
    let signature = sign_hmac(&body_bytes, SECRET);

    let (status, response) = post_ingest(app, &body_bytes, Some(signature)).await;
    assert_eq!(status, StatusCode::OK);
    let results = response.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["idempotent"], json!(false));

    let mut queue = queue_for_worker.lock().await;
    deliver_one(&store, &mut queue, &queue_name, &downstream.uri()).await;

    let event_id = ObjectId::parse_str(results[0]["event_id"].as_str().unwrap()).unwrap();
    let event = store.find_by_id(event_id).await.unwrap().unwrap();
    assert_eq!(event.status, EventStatus::Delivered);
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_s2_idempotent_replay_returns_same_event_id() {
    let state = test_relay_state("relay_e2e_s2").await;
    let app = relay::create_router(state);

    let body = json!({"event_type": "order.created", "idempotency_key": "s2-key", "data": {}});
    let body_bytes = serde_json::to_vec(&body).unwrap();
    let signature = sign_hmac(&body_bytes, SECRET);

    let (_, first) = post_ingest(app.clone(), &body_bytes, Some(signature.clone())).await;
    let (_, second) = post_ingest(app, &body_bytes, Some(signature)).await;

    let first_id = first.as_array().unwrap()[0]["event_id"].clone();
    let second_result = &second.as_array().unwrap()[0];
    assert_eq!(second_result["event_id"], first_id);
    assert_eq!(second_result["idempotent"], json!(true));
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_s3_batch_returns_one_result_per_event() {
    let state = test_relay_state("relay_e2e_s3").await;
    let app = relay::create_router(state);

    let body = json!([{"order_id": 1}, {"order_id": 2}]);
    let body_bytes = serde_json::to_vec(&body).unwrap();
    let signature = sign_hmac(&body_bytes, SECRET);

    let (status, response) = post_ingest(app, &body_bytes, Some(signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response.as_array().unwrap().len(), 2);
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_s4_bad_signature_is_rejected_and_nothing_is_inserted() {
    let state = test_relay_state("relay_e2e_s4").await;
    let store = Arc::clone(&state.store);
    let app = relay::create_router(state);

    let marker = format!("s4-{}", Utc::now().timestamp_nanos_opt().unwrap());
    let body = json!({"event_type": marker});
    let body_bytes = serde_json::to_vec(&body).unwrap();
    let bad_signature = "00".repeat(32);

    let (status, _) = post_ingest(app, &body_bytes, Some(bad_signature)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let filter = relay_common::EventFilter {
        status: None,
        event_type: Some(marker),
        from_timestamp: None,
        to_timestamp: None,
    };
    let (data, _) = store.search(&filter, 0, 10).await.unwrap();
    assert!(data.is_empty());
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_s5_downstream_always_500_exhausts_retries() {
    let downstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&downstream)
        .await;

    let state = test_relay_state("relay_e2e_s5").await;
    let store = Arc::clone(&state.store);
    let queue = Arc::clone(&state.queue);
    let queue_name = state.config.delivery_queue_name.clone();
    let app = relay::create_router(state);

    let body = json!({"event_type": "always.fails"});
    let body_bytes = serde_json::to_vec(&body).unwrap();
    let signature = sign_hmac(&body_bytes, SECRET);
    let (_, response) = post_ingest(app, &body_bytes, Some(signature)).await;
    let event_id = ObjectId::parse_str(
        response.as_array().unwrap()[0]["event_id"].as_str().unwrap(),
    )
    .unwrap();

    {
        let mut queue = queue.lock().await;
        deliver_one(&store, &mut queue, &queue_name, &downstream.uri()).await;
    }

    let event = store.find_by_id(event_id).await.unwrap().unwrap();
    assert_eq!(event.status, EventStatus::FailedPermanently);
    assert_eq!(event.delivery_attempts.len(), 5);
    assert!(event.delivery_attempts.iter().all(|a| !a.success));
    assert!(event
        .delivery_attempts
        .iter()
        .enumerate()
        .all(|(i, a)| a.attempt_number == (i as u32) + 1));
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_s6_rate_limiter_admits_three_then_rejects_fourth() {
    // Exercises `RateLimiter` directly rather than through the full HTTP
    // handler: the handler also runs the downstream mock's probabilistic
    // outcome injector (including a multi-second simulated timeout), which
    // would race against the limiter's one-second window and make this
    // scenario flaky. This isolates the limiter's own admit/reject boundary.
    let redis_url = test_redis_url();
    let client = redis::Client::open(redis_url.as_str()).unwrap();
    let manager = redis::aio::ConnectionManager::new(client).await.unwrap();
    let limiter = downstream_mock::rate_limiter::RateLimiter::new(manager);

    let ip = format!("203.0.113.{}", (Utc::now().timestamp_millis() % 250) + 1);

    for _ in 0..3 {
        assert!(limiter.allow(&ip).await, "first three requests must be admitted");
    }

    assert!(
        !limiter.allow(&ip).await,
        "fourth request within the window must be rejected"
    );
}
