//! Pipeline-specific error types.

use crate::pipeline::stats::StageKind;
use thiserror::Error;

/// Error type returned by external capabilities (sources and sinks).
///
/// Boxed so collaborators keep their own error types.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can end a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Source failed while reading item {index}: {source}")]
    Source {
        index: u64,
        #[source]
        source: BoxError,
    },

    #[error("Sink failed on item {index}: {source}")]
    Sink {
        index: u64,
        #[source]
        source: BoxError,
    },

    #[error("Sink failed to finish: {0}")]
    SinkFinish(#[source] BoxError),

    #[error("{stage} stage panicked")]
    StagePanicked { stage: StageKind },

    #[error("Failed to spawn {stage} stage thread: {source}")]
    Spawn {
        stage: StageKind,
        #[source]
        source: std::io::Error,
    },

    #[error("Pipeline run was cancelled")]
    Cancelled,

    #[error("Queue '{queue}' was not drained at completion")]
    Undrained { queue: &'static str },
}

impl PipelineError {
    /// Whether this error is a consequence of cancellation rather than a root cause.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
