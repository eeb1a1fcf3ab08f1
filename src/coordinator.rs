//! # Lifecycle Coordinator
//!
//! Owns the producer timeline and the shutdown ordering: stop the generator
//! first, then drain the dispatcher's in-flight pipeline runs, then release
//! the execution-engine connection exactly once. In-flight runs are allowed
//! to finish rather than being hard-killed; the drain budget bounds
//! worst-case shutdown latency.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::batch::Batcher;
use crate::config::TelemetryConfig;
use crate::dispatch::{BatchDispatcher, DrainOutcome};
use crate::error::{Result, TelemetryError};
use crate::execution::ExecutionEngine;
use crate::pipeline::AggregationPipeline;
use crate::signal::SignalGenerator;
use crate::sink::ReportingSink;

/// Ties generator, batcher, dispatcher, and shutdown signaling together
pub struct LifecycleCoordinator {
    config: TelemetryConfig,
    engine: Arc<dyn ExecutionEngine>,
    sink: Arc<dyn ReportingSink>,
}

impl LifecycleCoordinator {
    pub fn new(
        config: TelemetryConfig,
        engine: Arc<dyn ExecutionEngine>,
        sink: Arc<dyn ReportingSink>,
    ) -> Self {
        Self {
            config,
            engine,
            sink,
        }
    }

    /// Run the pipeline until a fatal error or the cancel signal fires and
    /// drain completes
    ///
    /// Returns the first fatal error encountered; per-batch failures are
    /// reported through the sink and are not fatal.
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let pipeline = Arc::new(AggregationPipeline::new(
            self.engine.clone(),
            &self.config.execution,
        ));
        let dispatcher =
            BatchDispatcher::new(&self.config.dispatcher, pipeline, self.sink.clone());

        // Generator and batcher share the single producer timeline; neither
        // is touched by any other task
        let mut generator = SignalGenerator::new(self.config.signal.clone());
        let mut batcher = Batcher::new(self.config.batch.capacity);
        let mut ticker = tokio::time::interval(self.config.batch.tick_interval());

        info!(
            capacity = self.config.batch.capacity,
            tick_interval_ms = self.config.batch.tick_interval_ms,
            "Telemetry pipeline running"
        );

        let fatal: Option<TelemetryError> = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let reading = generator.next_reading();
                    if let Some(batch) = batcher.append(reading) {
                        // Backpressure: submit blocks while the queue is full
                        if let Err(e) = dispatcher.submit(batch).await {
                            error!(error = %e, "Batch submission failed, shutting down");
                            break Some(e.into());
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Cancel signal received, stopping producer");
                    break None;
                }
            }
        };

        // Partial-batch policy: discard (reference behavior); the readings
        // never reached capacity so no BatchResult is owed for them
        if let Some(partial) = batcher.take_partial() {
            info!(
                batch_id = %partial.batch_id,
                discarded_readings = partial.len(),
                "Discarding partial batch at shutdown"
            );
        }

        // Drain in-flight runs before releasing the engine connection
        if let DrainOutcome::TimedOut { abandoned_workers } = dispatcher.shutdown().await {
            warn!(
                abandoned_workers,
                "Shutdown drain timed out, releasing resources anyway"
            );
        }

        // Closed exactly once, after drain
        self.engine.close().await;

        match fatal {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
