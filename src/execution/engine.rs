//! # In-Process Reference Engine
//!
//! Local implementation of the execution engine contract: runs each step
//! attempt under a timeout, retries with exponential backoff per the
//! configured policy, and surfaces only the terminal outcome. A fault
//! injection hook lets tests drive transient and terminal step failures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::batch::Batch;
use crate::execution::{EngineError, ExecutionEngine, RetryPolicy, StepFailure};
use crate::pipeline::StepKind;

/// Hook invoked before every step attempt; returning an error message fails
/// that attempt
///
/// Runs on a blocking thread, so hooks may sleep to simulate slow attempts.
pub type FaultHook = Arc<dyn Fn(StepKind, &Batch) -> Result<(), String> + Send + Sync>;

/// Aggregate execution counters
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    pub steps_succeeded: u64,
    pub steps_failed: u64,
    pub total_attempts: u64,
}

/// In-process execution engine
///
/// The handle is shared read-only across all dispatcher workers and closed
/// exactly once by the lifecycle coordinator after drain completes.
pub struct InProcessEngine {
    closed: AtomicBool,
    fault_hook: Option<FaultHook>,
    stats: Mutex<EngineStats>,
}

impl InProcessEngine {
    pub fn new() -> Self {
        Self {
            closed: AtomicBool::new(false),
            fault_hook: None,
            stats: Mutex::new(EngineStats::default()),
        }
    }

    /// Attach a fault injection hook, consulted before every attempt
    pub fn with_fault_hook(hook: FaultHook) -> Self {
        Self {
            closed: AtomicBool::new(false),
            fault_hook: Some(hook),
            stats: Mutex::new(EngineStats::default()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> EngineStats {
        self.stats.lock().clone()
    }
}

impl Default for InProcessEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionEngine for InProcessEngine {
    async fn execute_step(
        &self,
        step: StepKind,
        batch: &Batch,
        retry_policy: &RetryPolicy,
        step_timeout: Duration,
    ) -> Result<f64, EngineError> {
        let mut attempts: u32 = 0;
        // Attempts run off the async executor so the timeout can preempt a
        // slow computation; an abandoned attempt may still finish in the
        // background, consistent with at-least-once execution
        let shared = Arc::new(batch.clone());

        loop {
            if self.is_closed() {
                return Err(EngineError::ConnectionClosed);
            }

            attempts += 1;
            self.stats.lock().total_attempts += 1;

            let hook = self.fault_hook.clone();
            let attempt_batch = shared.clone();
            let attempt = timeout(
                step_timeout,
                tokio::task::spawn_blocking(move || -> Result<f64, String> {
                    if let Some(hook) = &hook {
                        hook(step, &attempt_batch)?;
                    }
                    step.compute(&attempt_batch).map_err(|e| e.to_string())
                }),
            )
            .await;

            let last_error = match attempt {
                Ok(Ok(Ok(value))) => {
                    self.stats.lock().steps_succeeded += 1;
                    debug!(
                        step = %step,
                        batch_id = %batch.batch_id,
                        attempts,
                        "Step completed"
                    );
                    return Ok(value);
                }
                Ok(Ok(Err(message))) => message,
                Ok(Err(join_error)) => format!("attempt panicked: {join_error}"),
                Err(_) => format!("attempt timed out after {}ms", step_timeout.as_millis()),
            };

            if retry_policy.attempts_exhausted(attempts) {
                self.stats.lock().steps_failed += 1;
                warn!(
                    step = %step,
                    batch_id = %batch.batch_id,
                    attempts,
                    error = %last_error,
                    "Step failed terminally, retries exhausted"
                );
                return Err(StepFailure::RetriesExhausted {
                    step,
                    attempts,
                    last_error,
                }
                .into());
            }

            let delay = retry_policy.delay_after(attempts);
            debug!(
                step = %step,
                batch_id = %batch.batch_id,
                attempts,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "Step attempt failed, backing off before retry"
            );
            sleep(delay).await;
        }
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            warn!("Execution engine close called more than once");
            return;
        }
        let stats = self.stats();
        info!(
            steps_succeeded = stats.steps_succeeded,
            steps_failed = stats.steps_failed,
            total_attempts = stats.total_attempts,
            "Execution engine connection released"
        );
    }
}
