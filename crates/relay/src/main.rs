use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};

use relay::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    relay_common::init_tracing();

    info!("starting relay service");

    let config = Config::from_env().context("failed to load configuration")?;
    info!(host = %config.server_host, port = config.server_port, "configuration loaded");

    let state = relay::build_state(config.clone())
        .await
        .context("failed to initialize relay state")?;

    let app = relay::create_router(state);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("relay listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("relay shut down gracefully");
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
