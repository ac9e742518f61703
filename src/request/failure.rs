//! Errors recorded on request descriptors.

use std::sync::Arc;

use thiserror::Error;

use super::{Method, Request};
use crate::sink::SinkError;
use crate::transport::TransportError;

/// Error raised by a single execution attempt.
///
/// Every variant is treated as a failed attempt by the worker; whether the
/// attempt is retried is decided by the [`RetryPolicy`](crate::RetryPolicy).
#[derive(Debug, Error)]
pub enum AttemptError {
    /// The HTTP transport failed (timeout, disconnect, status, ...).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Writing the response to the result sink failed.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The transport or sink panicked while handling the attempt.
    #[error("attempt panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
}

impl AttemptError {
    /// Creates a panic error from a `catch_unwind` payload.
    pub(crate) fn panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::Panicked { message }
    }
}

/// Terminal failure stored on a descriptor once its attempts are exhausted.
///
/// Cheap to clone: the underlying attempt error is shared, so the same failure
/// can be surfaced from the descriptor any number of times.
#[derive(Debug, Clone, Error)]
#[error("{method} {url} failed after {attempts} attempt(s): {source}")]
pub struct RequestFailure {
    method: Method,
    url: String,
    attempts: u32,
    #[source]
    source: Arc<AttemptError>,
}

impl RequestFailure {
    /// Creates a failure for `request` from the last observed attempt error.
    #[must_use]
    pub fn new(request: &Request, error: AttemptError) -> Self {
        Self {
            method: request.method(),
            url: request.url().to_string(),
            attempts: request.attempts(),
            source: Arc::new(error),
        }
    }

    /// Method of the failed request.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// URL of the failed request.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of attempts made before giving up.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The last attempt error.
    #[must_use]
    pub fn cause(&self) -> &AttemptError {
        &self.source
    }
}
