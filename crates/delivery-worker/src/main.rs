use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use relay_common::{EventStore, QueueClient};
use tokio::signal;
use tokio::sync::Barrier;
use tracing::{error, info, warn};

use delivery_worker::config::Config;
use delivery_worker::health::{self, ServiceState};
use delivery_worker::worker;

#[tokio::main]
async fn main() -> Result<()> {
    relay_common::init_tracing();

    info!("starting delivery worker pool");

    let config = Config::from_env().context("failed to load configuration")?;
    info!(
        workers = config.worker_count,
        downstream = %config.downstream_url,
        queue = %config.delivery_queue_name,
        "configuration loaded"
    );

    let store = Arc::new(
        EventStore::connect(&config.mongodb_url, &config.mongodb_database)
            .await
            .context("failed to connect to the event store")?,
    );

    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("failed to build HTTP client")?;

    let service_state = ServiceState {
        ready: Arc::new(AtomicBool::new(false)),
        workers_initialized: Arc::new(AtomicUsize::new(0)),
        worker_count: config.worker_count,
    };

    let health_port = config.health_port;
    let health_state = service_state.clone();
    tokio::spawn(async move {
        let app = health::router(health_state);
        let addr = format!("0.0.0.0:{health_port}");
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => {
                info!("health server listening on {}", addr);
                if let Err(err) = axum::serve(listener, app).await {
                    error!("health server error: {}", err);
                }
            }
            Err(err) => {
                warn!("failed to bind health server to {}: {}", addr, err);
            }
        }
    });

    {
        let redis_url = config.redis_url.clone();
        let queue_name = config.delivery_queue_name.clone();
        tokio::spawn(async move {
            let mut queue = match QueueClient::connect(&redis_url).await {
                Ok(q) => q,
                Err(err) => {
                    warn!("queue depth gauge disabled, failed to connect: {}", err);
                    return;
                }
            };
            loop {
                match queue.queue_length(&queue_name).await {
                    Ok(depth) => delivery_worker::metrics::QUEUE_DEPTH.set(depth),
                    Err(err) => warn!("failed to poll queue depth: {}", err),
                }
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        });
    }

    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);
    let init_barrier = Arc::new(Barrier::new(config.worker_count + 1));

    let mut handles = Vec::with_capacity(config.worker_count);
    for worker_id in 0..config.worker_count {
        let config = config.clone();
        let store = Arc::clone(&store);
        let http_client = http_client.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        let barrier = Arc::clone(&init_barrier);
        let state = service_state.clone();

        let handle = tokio::spawn(async move {
            let queue = match QueueClient::connect(&config.redis_url).await {
                Ok(q) => {
                    state.workers_initialized.fetch_add(1, Ordering::SeqCst);
                    q
                }
                Err(err) => {
                    error!(worker_id, "failed to create queue client: {}", err);
                    return;
                }
            };

            barrier.wait().await;
            info!(worker_id, "ready, entering dequeue loop");

            if let Err(err) =
                run_worker(worker_id, queue, &config, &store, &http_client, &mut shutdown_rx).await
            {
                error!(worker_id, "worker loop ended with error: {}", err);
            }
        });

        handles.push(handle);
    }

    info!("waiting for {} workers to initialize", config.worker_count);
    init_barrier.wait().await;
    service_state.ready.store(true, Ordering::SeqCst);
    info!("delivery worker pool ready");

    let shutdown_reason = tokio::select! {
        _ = signal::ctrl_c() => "received Ctrl+C",
        _ = async { for handle in &mut handles { let _ = handle.await; } } => "all workers stopped",
    };
    info!("{}, shutting down", shutdown_reason);

    let _ = shutdown_tx.send(());
    let _ = tokio::time::timeout(Duration::from_secs(10), async {
        for handle in handles {
            let _ = handle.await;
        }
    })
    .await;

    info!("delivery worker pool stopped");
    Ok(())
}

async fn run_worker(
    worker_id: usize,
    mut queue: QueueClient,
    config: &Config,
    store: &EventStore,
    http_client: &reqwest::Client,
    shutdown_rx: &mut tokio::sync::broadcast::Receiver<()>,
) -> Result<()> {
    loop {
        if shutdown_rx.try_recv().is_ok() {
            info!(worker_id, "shutdown signal received");
            break;
        }

        let job = match queue.dequeue(&config.delivery_queue_name, 5).await {
            Ok(Some(job)) => job,
            Ok(None) => continue,
            Err(err) => {
                error!(worker_id, "failed to dequeue job: {}", err);
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        if let Err(err) = worker::handle_job(
            worker_id,
            job,
            store,
            http_client,
            &config.downstream_url,
        )
        .await
        {
            error!(worker_id, "failed to process job: {}", err);
        }
    }

    Ok(())
}
