//! # Execution Engine Boundary
//!
//! The durable task-execution engine is an external collaborator: the core
//! hands it one statistic step at a time together with a declarative
//! [`RetryPolicy`] and a per-attempt timeout, and sees only the terminal
//! outcome. Intermediate retry attempts are invisible to the core.
//!
//! [`InProcessEngine`] is the reference implementation of the contract,
//! honoring the retry parameters exactly and supporting fault injection so
//! retry exhaustion and failure isolation stay testable without a network.

pub mod engine;

pub use engine::{EngineStats, InProcessEngine};

use async_trait::async_trait;
use std::time::Duration;

use crate::batch::Batch;
use crate::config::StepExecutionConfig;
use crate::pipeline::StepKind;

/// Declarative retry policy honored exactly by the execution engine
///
/// Delay before retry `n` (1-based count of completed failed attempts) is
/// `min(initial_interval * backoff_multiplier^(n-1), max_interval)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry
    pub initial_interval: Duration,
    /// Multiplicative backoff factor
    pub backoff_multiplier: f64,
    /// Cap on the delay between attempts
    pub max_interval: Duration,
    /// Cap on the attempt count; 0 means unbounded
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Build the policy from the step execution configuration
    pub fn from_config(config: &StepExecutionConfig) -> Self {
        Self {
            initial_interval: Duration::from_millis(config.retry_initial_interval_ms),
            backoff_multiplier: config.retry_backoff_multiplier,
            max_interval: Duration::from_millis(config.retry_max_interval_ms),
            max_attempts: config.retry_max_attempts,
        }
    }

    /// Whether `attempts` completed attempts exhaust the policy
    pub fn attempts_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts != 0 && attempts >= self.max_attempts
    }

    /// Delay to apply after the `failed_attempts`-th failure (1-based)
    pub fn delay_after(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1);
        let factor = self.backoff_multiplier.powi(exponent.min(1_000) as i32);
        let delay = self.initial_interval.as_secs_f64() * factor;
        let capped = delay.min(self.max_interval.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&StepExecutionConfig::default())
    }
}

/// Terminal failure of one submitted step
#[derive(Debug, Clone, thiserror::Error)]
pub enum StepFailure {
    #[error("{step} exhausted {attempts} attempts, last error: {last_error}")]
    RetriesExhausted {
        step: StepKind,
        attempts: u32,
        last_error: String,
    },
}

/// Engine-level errors surfaced to the caller
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// The shared connection handle was already released
    #[error("Execution engine connection is closed")]
    ConnectionClosed,

    #[error(transparent)]
    Step(#[from] StepFailure),
}

/// Contract required of the durable task-execution engine
///
/// Scheduling a unit of work and awaiting its result collapse into the one
/// suspension point of `execute_step`; the engine guarantees at-least-once
/// execution and surfaces only the final outcome.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Schedule one statistic step over a batch and await its terminal
    /// outcome (success value or exhausted-retry failure)
    async fn execute_step(
        &self,
        step: StepKind,
        batch: &Batch,
        retry_policy: &RetryPolicy,
        step_timeout: Duration,
    ) -> Result<f64, EngineError>;

    /// Release the engine connection; called exactly once, after drain
    async fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(initial_ms: u64, multiplier: f64, max_ms: u64, max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            initial_interval: Duration::from_millis(initial_ms),
            backoff_multiplier: multiplier,
            max_interval: Duration::from_millis(max_ms),
            max_attempts,
        }
    }

    #[test]
    fn test_backoff_doubles_until_cap() {
        let policy = policy(1_000, 2.0, 100_000, 500);

        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
        assert_eq!(policy.delay_after(7), Duration::from_secs(64));
        // 2^7 = 128s exceeds the 100s cap
        assert_eq!(policy.delay_after(8), Duration::from_secs(100));
        assert_eq!(policy.delay_after(30), Duration::from_secs(100));
    }

    #[test]
    fn test_zero_max_attempts_is_unbounded() {
        let policy = policy(10, 2.0, 1_000, 0);
        assert!(!policy.attempts_exhausted(1));
        assert!(!policy.attempts_exhausted(u32::MAX));
    }

    #[test]
    fn test_attempts_exhausted_at_cap() {
        let policy = policy(10, 2.0, 1_000, 3);
        assert!(!policy.attempts_exhausted(2));
        assert!(policy.attempts_exhausted(3));
        assert!(policy.attempts_exhausted(4));
    }

    #[test]
    fn test_default_policy_matches_config() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.initial_interval, Duration::from_secs(1));
        assert_eq!(policy.backoff_multiplier, 2.0);
        assert_eq!(policy.max_interval, Duration::from_secs(100));
        assert_eq!(policy.max_attempts, 500);
    }
}
