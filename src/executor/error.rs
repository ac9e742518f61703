//! Error types for the executor.

use thiserror::Error;

use super::{MAX_WORKERS, MIN_WORKERS};
use crate::request::RequestFailure;
use crate::sink::SinkError;

/// Errors that stop a run from starting or completing.
///
/// Individual request failures are not executor errors: they are recorded on
/// the descriptors and surfaced through the collection methods.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Invalid worker count provided.
    #[error("invalid worker count {value}: must be between {MIN_WORKERS} and {MAX_WORKERS}")]
    InvalidWorkers {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The sink rejected the request list before any request was issued.
    #[error("configuration error: {0}")]
    Configuration(#[source] SinkError),

    /// The sink could not prepare its storage.
    #[error("sink setup failed: {0}")]
    Sink(#[source] SinkError),

    /// `run` was called on an executor that already ran.
    #[error("executor has already run; build a new one for another batch")]
    AlreadyRun,

    /// A request did not come back from the workers.
    #[error("request #{index} was not returned by the worker pool")]
    MissingResult {
        /// Position of the request in the input list.
        index: usize,
    },
}

/// Errors raised while collecting results after a run.
#[derive(Debug, Error)]
pub enum CollectError {
    /// A request failed and the caller asked for failures to be raised.
    #[error(transparent)]
    Failed(#[from] RequestFailure),

    /// A body is not valid UTF-8.
    #[error("response #{index} is not valid UTF-8: {source}")]
    Decode {
        /// Position of the request in the input list.
        index: usize,
        /// The decoding error.
        #[source]
        source: std::str::Utf8Error,
    },

    /// A body is not valid JSON for the requested type.
    #[error("response #{index} is not valid JSON: {source}")]
    Json {
        /// Position of the request in the input list.
        index: usize,
        /// The parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl CollectError {
    /// Position of the offending request, when the error concerns one body.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Failed(_) => None,
            Self::Decode { index, .. } | Self::Json { index, .. } => Some(*index),
        }
    }
}
