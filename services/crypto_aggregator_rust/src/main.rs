use anyhow::{Context, Result};
use crypto_aggregator_core::telemetry;
use crypto_aggregator_rust::{router, AppState, Config, Engine};
use dotenv::dotenv;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting crypto aggregator service...");

    // Metrics
    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    telemetry::describe();

    let config = Config::from_env()?;
    let engine = Engine::from_config(&config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Refresh cycle
    let poller = engine.poller.clone();
    let interval = config.refresh_interval();
    let poller_handle = tokio::spawn(async move { poller.run(interval, shutdown_rx).await });

    // HTTP
    let app = router(AppState {
        store: engine.store.clone(),
        poller: engine.poller.clone(),
        aggregator: engine.aggregator.clone(),
        metrics,
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to address {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await
        .context("Server error")?;

    if let Err(e) = poller_handle.await {
        error!("Poller task failed: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
