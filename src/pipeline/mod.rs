//! # Aggregation Pipeline
//!
//! Four independent statistic computations (min, max, average, standard
//! deviation) executed against one batch through the execution engine, each
//! retried independently on failure, followed by a deterministic local
//! result-assembly step.

pub mod steps;
pub mod workflow;

pub use steps::{StepError, StepKind};
pub use workflow::AggregationPipeline;

use crate::execution::EngineError;

/// Errors terminal to one pipeline run
///
/// A failed run is surfaced for its batch only; it never cancels sibling
/// runs or the producer.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{step} step failed: {source}")]
    StepFailed {
        step: StepKind,
        #[source]
        source: EngineError,
    },

    #[error("Cannot aggregate an empty batch")]
    EmptyBatch,
}
