//! Crate-level error taxonomy
//!
//! Batch-level failures stay inside the dispatcher and are reported, never
//! propagated here. Only producer- or coordinator-level failures surface as
//! a `TelemetryError` and abort the run.

use crate::dispatch::DispatchError;
use crate::execution::EngineError;
use crate::pipeline::PipelineError;

/// Errors fatal to the pipeline as a whole
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Producer failure: {0}")]
    Producer(String),

    #[error("Dispatch failure: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Pipeline failure: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Execution engine failure: {0}")]
    Engine(#[from] EngineError),

    #[error("Coordinator failure: {0}")]
    Coordinator(String),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
