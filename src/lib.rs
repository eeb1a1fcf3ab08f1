#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Telemetry Batch Core
//!
//! Continuously synthesizes a time-series signal, groups readings into
//! fixed-size batches, and runs each batch through a durable, retry-safe
//! aggregation pipeline producing summary statistics (min, max, average,
//! standard deviation, first/last sample).
//!
//! ## Architecture
//!
//! Data flow: Generator → Batcher → (on full) → Dispatcher → Aggregation
//! Pipeline → Result. Control flow: a cancel signal propagates from the
//! lifecycle coordinator to the generator (stop producing) and then to the
//! dispatcher (drain in-flight batches before releasing the execution-engine
//! connection).
//!
//! Step scheduling, retry, and timeout enforcement are delegated to an
//! execution engine behind the [`execution::ExecutionEngine`] trait; the
//! core's statistic steps are pure functions returning explicit results.
//!
//! ## Module Organization
//!
//! - [`config`] - Immutable configuration structs
//! - [`signal`] - Ornstein-Uhlenbeck signal generator
//! - [`batch`] - Reading/Batch/BatchResult data model and the batcher
//! - [`pipeline`] - Statistic steps and the per-batch workflow
//! - [`execution`] - Engine contract, retry policy, in-process engine
//! - [`dispatch`] - Bounded worker pool dispatcher
//! - [`coordinator`] - Lifecycle coordination and graceful drain
//! - [`sink`] - Reporting sink boundary
//! - [`error`] - Crate-level error taxonomy
//! - [`logging`] - Structured logging setup

pub mod batch;
pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod execution;
pub mod logging;
pub mod pipeline;
pub mod signal;
pub mod sink;

pub use batch::{Batch, BatchResult, Batcher, Reading};
pub use config::{
    BatchConfig, DispatcherConfig, SignalConfig, StepExecutionConfig, TelemetryConfig,
};
pub use coordinator::LifecycleCoordinator;
pub use dispatch::{BatchDispatcher, DispatchError, DispatcherStats, DrainOutcome};
pub use error::{Result, TelemetryError};
pub use execution::{EngineError, ExecutionEngine, InProcessEngine, RetryPolicy, StepFailure};
pub use pipeline::{AggregationPipeline, PipelineError, StepKind};
pub use signal::SignalGenerator;
pub use sink::{LogSink, MemorySink, ReportingSink};
