//! # Stream Relay
//!
//! Service entry point: configuration, logging, composition, lifecycle.

use anyhow::{Context, Result};
use relay_runtime::{LogMessenger, RelayConfig, RelayRuntime};
use relay_stream::NoOpContentPlatform;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = RelayConfig::load().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with_target(true)
        .init();

    info!("===========================================");
    info!("  Stream Relay v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");
    info!(keyword = %config.keyword, snapshot = %config.snapshot_path.display(), "Configuration loaded");

    // The no-op platform and log-only messenger keep the relay inert but
    // fully wired; real platform adapters replace them at deployment.
    let runtime = RelayRuntime::new(
        &config,
        Arc::new(NoOpContentPlatform),
        Arc::new(LogMessenger),
    );
    let runner = runtime.start().await;

    info!("Relay is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    runtime.shutdown().await;
    runner.await?;
    Ok(())
}
