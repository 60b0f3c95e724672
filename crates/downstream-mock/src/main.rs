use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};

use downstream_mock::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    relay_common::init_tracing();

    info!("starting downstream mock");

    let config = Config::from_env().context("failed to load configuration")?;
    let state = downstream_mock::build_state(&config)
        .await
        .context("failed to initialize downstream mock state")?;
    let app = downstream_mock::create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("downstream mock listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("downstream mock shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("received Ctrl+C, shutting down..."),
        _ = terminate => warn!("received terminate signal, shutting down..."),
    }
}
