//! Redis-backed delivery queue client.
//!
//! The relay enqueues delivery jobs with `LPUSH`; workers drain them with the
//! blocking `BRPOP`. A single small wrapper is shared by both sides so the
//! wire format (JSON-encoded [`DeliveryJob`]) stays in one place.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use relay_domain::DeliveryJob;
use tracing::{debug, info};

use crate::error::Result;

pub struct QueueClient {
    manager: ConnectionManager,
}

impl QueueClient {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        info!("connecting to Redis at {}", redis_url);
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self { manager })
    }

    pub async fn ping(&mut self) -> Result<()> {
        let _: String = redis::cmd("PING").query_async(&mut self.manager).await?;
        Ok(())
    }

    /// Best-effort enqueue. Callers must not let a failure here block or
    /// fail the ingest response — the event stays `RECEIVED` and can be
    /// re-enqueued by an external sweeper.
    pub async fn enqueue(&mut self, queue_name: &str, job: &DeliveryJob) -> Result<()> {
        let payload = serde_json::to_string(job)?;
        self.manager.lpush::<_, _, ()>(queue_name, payload).await?;
        Ok(())
    }

    /// Blocking pop with a timeout in seconds; `Ok(None)` on timeout.
    pub async fn dequeue(&mut self, queue_name: &str, timeout_secs: usize) -> Result<Option<DeliveryJob>> {
        let result: Option<(String, String)> =
            self.manager.brpop(queue_name, timeout_secs as f64).await?;

        match result {
            Some((_queue, payload)) => {
                let job: DeliveryJob = serde_json::from_str(&payload)?;
                debug!(event_id = %job.event_id, "dequeued delivery job");
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    /// Current queue depth, exposed as a gauge by the worker.
    pub async fn queue_length(&mut self, queue_name: &str) -> Result<i64> {
        Ok(self.manager.llen(queue_name).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // requires a running Redis instance
    async fn test_enqueue_and_dequeue_roundtrip() {
        let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let mut client = QueueClient::connect(&redis_url).await.unwrap();

        let job = DeliveryJob {
            event_id: "507f1f77bcf86cd799439011".to_string(),
            request_id: Some("req-test".to_string()),
        };

        client.enqueue("test:delivery_queue", &job).await.unwrap();
        let dequeued = client
            .dequeue("test:delivery_queue", 1)
            .await
            .unwrap()
            .expect("job should be present");

        assert_eq!(dequeued.event_id, job.event_id);
    }
}
