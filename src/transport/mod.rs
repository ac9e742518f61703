//! HTTP transport capability consumed by the workers.
//!
//! The executor never talks to the network directly: it calls an
//! [`HttpTransport`], shared read-only across all workers. [`HttpClient`] is the
//! reqwest-backed implementation; tests and callers may supply their own.
//!
//! # Example
//!
//! ```no_run
//! use concurrent_requests::request::Request;
//! use concurrent_requests::transport::{HttpClient, HttpTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let body = client.execute(&Request::get("https://example.com")).await?;
//! println!("status {}", body.status());
//! let bytes = body.read_all().await?;
//! println!("{} bytes", bytes.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;

use std::fmt;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};

use crate::request::Request;

pub use client::{HttpClient, HttpClientConfig};
pub use constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
pub use error::TransportError;

/// Stream of response body chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Response handed from the transport to a result sink.
pub struct ResponseBody {
    status: u16,
    stream: ByteStream,
}

impl ResponseBody {
    /// Wraps a chunk stream.
    #[must_use]
    pub fn new(status: u16, stream: ByteStream) -> Self {
        Self { status, stream }
    }

    /// Response with a single in-memory chunk.
    #[must_use]
    pub fn from_bytes(status: u16, bytes: impl Into<Bytes>) -> Self {
        let bytes: Bytes = bytes.into();
        Self::new(status, stream::once(async move { Ok(bytes) }).boxed())
    }

    /// Response built from a fixed sequence of chunk results.
    #[must_use]
    pub fn from_chunks(status: u16, chunks: Vec<Result<Bytes, TransportError>>) -> Self {
        Self::new(status, stream::iter(chunks).boxed())
    }

    /// HTTP status code of the response.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Consumes the response, yielding the chunk stream.
    #[must_use]
    pub fn into_stream(self) -> ByteStream {
        self.stream
    }

    /// Reads the whole body into memory.
    ///
    /// # Errors
    ///
    /// Returns the first chunk error produced by the stream.
    pub async fn read_all(self) -> Result<Bytes, TransportError> {
        let mut stream = self.stream;
        let mut buffer = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// The HTTP client capability.
///
/// Implementations must be safe to call concurrently from every worker;
/// connection reuse is the implementation's concern. Any error returned is a
/// failed attempt.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issues `request` and returns its response body stream.
    async fn execute(&self, request: &Request) -> Result<ResponseBody, TransportError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_all_concatenates_chunks() {
        let body = ResponseBody::from_chunks(
            200,
            vec![Ok(Bytes::from_static(b"hel")), Ok(Bytes::from_static(b"lo"))],
        );
        assert_eq!(body.status(), 200);
        assert_eq!(body.read_all().await.unwrap().as_ref(), b"hello");
    }

    #[tokio::test]
    async fn test_read_all_surfaces_chunk_error() {
        let body = ResponseBody::from_chunks(
            200,
            vec![
                Ok(Bytes::from_static(b"part")),
                Err(TransportError::disconnected("https://example.com")),
            ],
        );
        let result = body.read_all().await;
        assert!(matches!(result, Err(TransportError::Disconnected { .. })));
    }

    #[test]
    fn test_debug_omits_stream() {
        let body = ResponseBody::from_bytes(204, Bytes::new());
        assert_eq!(format!("{body:?}"), "ResponseBody { status: 204, .. }");
    }
}
