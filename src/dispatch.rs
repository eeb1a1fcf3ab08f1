//! # Batch Dispatcher
//!
//! Decouples batch production cadence from aggregation pipeline latency via
//! a fixed-size pool of worker tasks reading from a bounded handoff queue.
//! `submit` applies backpressure when the queue is full rather than dropping
//! batches. Each submitted batch moves through the queue by ownership, so
//! exactly one pipeline run happens per batch. Per-batch failures are
//! reported through the sink and never affect sibling runs.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::batch::Batch;
use crate::config::DispatcherConfig;
use crate::pipeline::AggregationPipeline;
use crate::sink::ReportingSink;

/// Errors visible to the producer at the dispatch boundary
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The handoff queue is closed; the worker pool is gone
    #[error("Dispatch queue closed, batch rejected")]
    QueueClosed,
}

/// Outcome of the shutdown drain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// All in-flight and queued runs reached a terminal state
    Completed,
    /// The drain budget expired; remaining workers were abandoned
    TimedOut { abandoned_workers: usize },
}

/// Dispatch counters
#[derive(Debug, Clone, Default)]
pub struct DispatcherStats {
    pub batches_submitted: u64,
    pub batches_succeeded: u64,
    pub batches_failed: u64,
}

/// Bounded worker pool handing batches to the aggregation pipeline
///
/// Workers share one queue receiver; each runs at most one pipeline at a
/// time. Batches are picked up in submission order, though runs may complete
/// out of order.
pub struct BatchDispatcher {
    queue_tx: mpsc::Sender<Batch>,
    workers: Vec<JoinHandle<()>>,
    stats: Arc<Mutex<DispatcherStats>>,
    drain_timeout: Duration,
}

impl BatchDispatcher {
    /// Create the dispatcher and spawn its worker pool
    pub fn new(
        config: &DispatcherConfig,
        pipeline: Arc<AggregationPipeline>,
        sink: Arc<dyn ReportingSink>,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel::<Batch>(config.queue_depth.max(1));
        let queue_rx = Arc::new(tokio::sync::Mutex::new(queue_rx));
        let stats = Arc::new(Mutex::new(DispatcherStats::default()));

        let workers = (0..config.workers.max(1))
            .map(|worker_id| {
                let queue_rx = queue_rx.clone();
                let pipeline = pipeline.clone();
                let sink = sink.clone();
                let stats = stats.clone();

                tokio::spawn(async move {
                    worker_loop(worker_id, queue_rx, pipeline, sink, stats).await;
                })
            })
            .collect();

        info!(
            workers = config.workers.max(1),
            queue_depth = config.queue_depth.max(1),
            "Batch dispatcher started"
        );

        Self {
            queue_tx,
            workers,
            stats,
            drain_timeout: config.drain_timeout(),
        }
    }

    /// Enqueue a batch for exactly one pipeline run
    ///
    /// Blocks the caller while the queue is at capacity (backpressure);
    /// fails only once shutdown has closed the intake.
    pub async fn submit(&self, batch: Batch) -> Result<(), DispatchError> {
        debug!(batch_id = %batch.batch_id, batch_size = batch.len(), "Submitting batch");
        self.queue_tx
            .send(batch)
            .await
            .map_err(|_| DispatchError::QueueClosed)?;
        self.stats.lock().batches_submitted += 1;
        Ok(())
    }

    /// Snapshot of the dispatch counters
    pub fn stats(&self) -> DispatcherStats {
        self.stats.lock().clone()
    }

    /// Stop accepting submissions and drain in-flight work
    ///
    /// Closes the intake, then waits up to the drain budget for every queued
    /// and in-flight pipeline run to reach a terminal state. On budget
    /// expiry the remaining workers are abandoned with a warning; shutdown
    /// is best-effort, not silent loss.
    pub async fn shutdown(self) -> DrainOutcome {
        let worker_count = self.workers.len();
        info!(workers = worker_count, "Dispatcher draining");

        // Closing the queue lets workers finish the backlog and exit
        drop(self.queue_tx);

        match timeout(self.drain_timeout, join_all(self.workers)).await {
            Ok(joined) => {
                for result in joined {
                    if let Err(e) = result {
                        warn!(error = %e, "Dispatcher worker task panicked");
                    }
                }
                let stats = self.stats.lock().clone();
                info!(
                    batches_submitted = stats.batches_submitted,
                    batches_succeeded = stats.batches_succeeded,
                    batches_failed = stats.batches_failed,
                    "Dispatcher drain complete"
                );
                DrainOutcome::Completed
            }
            Err(_) => {
                warn!(
                    drain_timeout_ms = self.drain_timeout.as_millis() as u64,
                    "Drain budget expired with pipeline runs still in flight"
                );
                DrainOutcome::TimedOut {
                    abandoned_workers: worker_count,
                }
            }
        }
    }
}

/// One worker: pull batches until the queue closes, run the pipeline,
/// report the outcome
async fn worker_loop(
    worker_id: usize,
    queue_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Batch>>>,
    pipeline: Arc<AggregationPipeline>,
    sink: Arc<dyn ReportingSink>,
    stats: Arc<Mutex<DispatcherStats>>,
) {
    debug!(worker_id, "Dispatcher worker started");

    loop {
        // Hold the receiver lock only for the handoff, never across a run
        let batch = { queue_rx.lock().await.recv().await };

        let Some(batch) = batch else {
            break;
        };

        let batch_id = batch.batch_id;
        match pipeline.process(&batch).await {
            Ok(result) => {
                stats.lock().batches_succeeded += 1;
                sink.report_result(&result).await;
            }
            Err(error) => {
                // Terminal for this batch only; siblings keep running
                stats.lock().batches_failed += 1;
                warn!(worker_id, batch_id = %batch_id, error = %error, "Pipeline run failed");
                sink.report_failure(batch_id, &error).await;
            }
        }
    }

    debug!(worker_id, "Dispatcher worker finished");
}
