//! # Pipeline Workflow
//!
//! Submits the four statistic steps for one batch to the execution engine,
//! each under the configured retry policy and per-attempt timeout, then
//! assembles the `BatchResult` locally. Assembly is not retried: it touches
//! only the batch's first/last readings and the four computed statistics,
//! never re-traversing the batch.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::batch::{Batch, BatchResult};
use crate::config::StepExecutionConfig;
use crate::execution::{ExecutionEngine, RetryPolicy};
use crate::pipeline::{PipelineError, StepKind};

/// One-batch aggregation workflow against the execution engine
pub struct AggregationPipeline {
    engine: Arc<dyn ExecutionEngine>,
    retry_policy: RetryPolicy,
    step_timeout: Duration,
}

impl AggregationPipeline {
    pub fn new(engine: Arc<dyn ExecutionEngine>, config: &StepExecutionConfig) -> Self {
        Self {
            engine,
            retry_policy: RetryPolicy::from_config(config),
            step_timeout: config.step_timeout(),
        }
    }

    /// Run the full aggregation workflow for one batch
    ///
    /// Steps run as dependent computations in submission order; the first
    /// terminal step failure fails the whole run for this batch only.
    #[instrument(skip(self, batch), fields(batch_id = %batch.batch_id, batch_size = batch.len()))]
    pub async fn process(&self, batch: &Batch) -> Result<BatchResult, PipelineError> {
        if batch.is_empty() {
            return Err(PipelineError::EmptyBatch);
        }

        let minimum = self.run_step(StepKind::Min, batch).await?;
        let maximum = self.run_step(StepKind::Max, batch).await?;
        let average = self.run_step(StepKind::Average, batch).await?;
        let std_dev = self.run_step(StepKind::StdDev, batch).await?;

        debug!(minimum, maximum, average, std_dev, "All statistic steps completed");

        assemble(batch, minimum, maximum, average, std_dev)
    }

    async fn run_step(&self, step: StepKind, batch: &Batch) -> Result<f64, PipelineError> {
        self.engine
            .execute_step(step, batch, &self.retry_policy, self.step_timeout)
            .await
            .map_err(|source| PipelineError::StepFailed { step, source })
    }
}

/// Build the `BatchResult` from the batch's endpoints and the four computed
/// statistics
///
/// Deterministic and idempotent: the same inputs always yield an identical
/// result.
pub fn assemble(
    batch: &Batch,
    minimum: f64,
    maximum: f64,
    average: f64,
    std_dev: f64,
) -> Result<BatchResult, PipelineError> {
    let first = batch.first().ok_or(PipelineError::EmptyBatch)?;
    let last = batch.last().ok_or(PipelineError::EmptyBatch)?;

    Ok(BatchResult {
        batch_id: batch.batch_id,
        batch_size: batch.len(),
        first_value: first.value,
        first_timestamp: first.timestamp,
        last_value: last.value,
        last_timestamp: last.timestamp,
        average,
        minimum,
        maximum,
        std_dev,
    })
}
