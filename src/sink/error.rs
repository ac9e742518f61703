//! Error types for result sinks.

use std::path::PathBuf;

use thiserror::Error;

use crate::transport::TransportError;

/// Errors raised while validating or writing to a result sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// A persisting sink received a descriptor without a destination name.
    #[error("request {url} has no destination file name; file sinks require one on every request")]
    MissingDestination {
        /// URL of the offending descriptor.
        url: String,
    },

    /// A destination name would escape the sink directory or is empty.
    #[error("invalid destination file name {name:?} for {url}")]
    InvalidDestination {
        /// URL of the offending descriptor.
        url: String,
        /// The rejected name.
        name: String,
    },

    /// File system error while preparing or writing.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Reading the response body failed mid-copy.
    #[error(transparent)]
    Body(#[from] TransportError),
}

impl SinkError {
    /// Creates a missing-destination error.
    pub fn missing_destination(url: impl Into<String>) -> Self {
        Self::MissingDestination { url: url.into() }
    }

    /// Creates an invalid-destination error.
    pub fn invalid_destination(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self::InvalidDestination {
            url: url.into(),
            name: name.into(),
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error stems from sink configuration rather than the exchange.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingDestination { .. } | Self::InvalidDestination { .. }
        )
    }
}
