//! # Configuration Management
//!
//! Immutable configuration for the telemetry pipeline. All tunables live in
//! explicit structs injected at construction time rather than module-level
//! constants, so components stay testable with alternate parameter sets.
//! There is no file or CLI layer; the configuration surface is constants.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for the telemetry pipeline
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Ornstein-Uhlenbeck signal synthesis parameters
    pub signal: SignalConfig,

    /// Batch accumulation settings
    pub batch: BatchConfig,

    /// Worker pool and queue settings
    pub dispatcher: DispatcherConfig,

    /// Per-step execution settings at the engine boundary
    pub execution: StepExecutionConfig,
}

/// Parameters of the discretized Ornstein-Uhlenbeck process
///
/// `dt` matches the producer tick interval expressed in seconds, so one
/// generated reading corresponds to one process step.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignalConfig {
    /// Long-run mean the process reverts toward (Hz)
    pub mu: f64,
    /// Speed of mean reversion
    pub theta: f64,
    /// Volatility (Hz)
    pub sigma: f64,
    /// Time step in seconds
    pub dt: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            mu: 50.0,
            theta: 0.1,
            sigma: 0.05,
            dt: 0.05,
        }
    }
}

/// Batch accumulation settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
    /// Number of readings per batch; a batch is dispatched exactly at capacity
    pub capacity: usize,
    /// Producer tick interval in milliseconds
    pub tick_interval_ms: u64,
}

impl BatchConfig {
    /// Get the producer tick interval as a Duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            tick_interval_ms: 50,
        }
    }
}

/// Worker pool and handoff queue settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatcherConfig {
    /// Number of worker tasks; each runs at most one pipeline at a time
    pub workers: usize,
    /// Bounded handoff queue depth; `submit` applies backpressure when full
    pub queue_depth: usize,
    /// Maximum time to wait for in-flight pipeline runs during shutdown, ms
    pub drain_timeout_ms: u64,
}

impl DispatcherConfig {
    /// Get the shutdown drain budget as a Duration
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_depth: 8,
            drain_timeout_ms: 30_000,
        }
    }
}

/// Per-step execution settings handed to the execution engine
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StepExecutionConfig {
    /// Delay before the first retry, in milliseconds
    pub retry_initial_interval_ms: u64,
    /// Multiplicative backoff factor applied per attempt
    pub retry_backoff_multiplier: f64,
    /// Cap on the delay between attempts, in milliseconds
    pub retry_max_interval_ms: u64,
    /// Cap on the attempt count; 0 means unbounded
    pub retry_max_attempts: u32,
    /// Execution timeout for a single step attempt, in milliseconds
    pub step_timeout_ms: u64,
}

impl StepExecutionConfig {
    /// Get the single-attempt step timeout as a Duration
    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }
}

impl Default for StepExecutionConfig {
    fn default() -> Self {
        Self {
            retry_initial_interval_ms: 1_000,
            retry_backoff_multiplier: 2.0,
            retry_max_interval_ms: 100_000,
            retry_max_attempts: 500,
            step_timeout_ms: 60_000,
        }
    }
}
