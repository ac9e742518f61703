//! Error types for the HTTP transport.
//!
//! Every variant carries the URL it failed on so that retry and failure
//! observations stay readable without the originating descriptor.

use thiserror::Error;

/// Errors that can occur while executing a request.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Connection was reset or the server disconnected mid-exchange.
    #[error("server disconnected while requesting {url}")]
    Disconnected {
        /// The URL whose connection dropped.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    ///
    /// Only produced when the client is configured to treat error statuses
    /// as failures.
    #[error("HTTP {status} requesting {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The Retry-After header value, if present.
        retry_after: Option<String>,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// A request header name or value could not be encoded.
    #[error("invalid header {name:?} for {url}")]
    InvalidHeader {
        /// The URL the header belonged to.
        url: String,
        /// The offending header name.
        name: String,
    },

    /// Failure reported by a custom transport implementation.
    #[error("transport error requesting {url}: {message}")]
    Other {
        /// The URL that failed.
        url: String,
        /// Description of the failure.
        message: String,
    },
}

impl TransportError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a disconnect error.
    pub fn disconnected(url: impl Into<String>) -> Self {
        Self::Disconnected { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after: None,
        }
    }

    /// Creates an HTTP status error with a Retry-After header value.
    pub fn http_status_with_retry_after(
        url: impl Into<String>,
        status: u16,
        retry_after: Option<String>,
    ) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an invalid header error.
    pub fn invalid_header(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self::InvalidHeader {
            url: url.into(),
            name: name.into(),
        }
    }

    /// Creates an error for a custom transport.
    pub fn other(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Other {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Maps a reqwest error to the matching variant.
    pub(crate) fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::timeout(url)
        } else {
            Self::network(url, error)
        }
    }

    /// URL the error occurred on.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Network { url, .. }
            | Self::Timeout { url }
            | Self::Disconnected { url }
            | Self::HttpStatus { url, .. }
            | Self::InvalidUrl { url }
            | Self::InvalidHeader { url, .. }
            | Self::Other { url, .. } => url,
        }
    }
}
