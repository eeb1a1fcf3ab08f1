//! # Reporting Sink
//!
//! Receives one `BatchResult` (or a failure notification carrying the batch
//! identity) per completed pipeline run. The core enforces no ordering on
//! emissions; runs for different batches may complete out of order.

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{error, info};
use uuid::Uuid;

use crate::batch::BatchResult;
use crate::pipeline::PipelineError;

/// Consumer of per-batch pipeline outcomes
#[async_trait]
pub trait ReportingSink: Send + Sync {
    async fn report_result(&self, result: &BatchResult);
    async fn report_failure(&self, batch_id: Uuid, error: &PipelineError);
}

/// Sink that renders outcomes through structured logging
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl ReportingSink for LogSink {
    async fn report_result(&self, result: &BatchResult) {
        info!(
            batch_id = %result.batch_id,
            batch_size = result.batch_size,
            first = format!("{:.5} @ {}", result.first_value, result.first_timestamp.format("%H:%M:%S%.3f")),
            last = format!("{:.5} @ {}", result.last_value, result.last_timestamp.format("%H:%M:%S%.3f")),
            average = format!("{:.5}", result.average),
            minimum = format!("{:.5}", result.minimum),
            maximum = format!("{:.5}", result.maximum),
            std_dev = format!("{:.5}", result.std_dev),
            "Batch aggregated"
        );
    }

    async fn report_failure(&self, batch_id: Uuid, error: &PipelineError) {
        error!(batch_id = %batch_id, error = %error, "Batch pipeline run failed");
    }
}

/// In-memory sink for tests and inspection
#[derive(Debug, Default)]
pub struct MemorySink {
    results: Mutex<Vec<BatchResult>>,
    failures: Mutex<Vec<(Uuid, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> Vec<BatchResult> {
        self.results.lock().clone()
    }

    pub fn failures(&self) -> Vec<(Uuid, String)> {
        self.failures.lock().clone()
    }
}

#[async_trait]
impl ReportingSink for MemorySink {
    async fn report_result(&self, result: &BatchResult) {
        self.results.lock().push(result.clone());
    }

    async fn report_failure(&self, batch_id: Uuid, error: &PipelineError) {
        self.failures.lock().push((batch_id, error.to_string()));
    }
}
