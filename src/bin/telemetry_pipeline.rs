//! Telemetry pipeline entry point
//!
//! Thin glue: logging, configuration, engine and sink wiring, Ctrl-C to
//! cancel signal. The process exits non-zero only on fatal producer or
//! coordinator errors; individual batch failures are reported, not fatal.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast;
use tracing::info;

use telemetry_batch::{
    logging, InProcessEngine, LifecycleCoordinator, LogSink, TelemetryConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_structured_logging();

    let config = TelemetryConfig::default();
    let engine = Arc::new(InProcessEngine::new());
    let sink = Arc::new(LogSink);

    let coordinator = LifecycleCoordinator::new(config, engine, sink);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, initiating graceful shutdown");
            let _ = shutdown_tx.send(());
        }
    });

    coordinator
        .run(shutdown_rx)
        .await
        .context("telemetry pipeline terminated with a fatal error")
}
