//! Result sinks: where a successful response body goes.
//!
//! Two implementations ship with the crate:
//! - [`MemorySink`] reads the whole body and stores it on the descriptor
//! - [`FileSink`] streams the body into `directory/<file_name>` in fixed-size
//!   chunks and stores nothing on the descriptor
//!
//! One sink is chosen per executor; every descriptor in a run goes through it.

mod error;
mod file;
mod memory;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::request::Request;
use crate::transport::ResponseBody;

pub use error::SinkError;
pub use file::{DEFAULT_CHUNK_SIZE, FileSink};
pub use memory::MemorySink;

/// Destination for successful response bodies.
#[async_trait]
pub trait ResultSink: Send + Sync + std::fmt::Debug {
    /// Checks every descriptor before any request is issued.
    ///
    /// # Errors
    ///
    /// Returns a configuration [`SinkError`] for the first unusable descriptor.
    fn validate(&self, _requests: &[Request]) -> Result<(), SinkError> {
        Ok(())
    }

    /// Prepares storage before workers start.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Io`] if storage cannot be created.
    async fn prepare(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Drains `body` for `request`, returning the payload to record on success.
    ///
    /// The response stream and any storage handle are released on every exit
    /// path.
    async fn consume(&self, request: &Request, body: ResponseBody)
    -> Result<Option<Bytes>, SinkError>;
}

/// Serializable sink selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum SinkKind {
    /// Buffer bodies in memory.
    #[default]
    Memory,
    /// Stream bodies into files under `directory`.
    File {
        directory: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chunk_size: Option<usize>,
    },
}

impl SinkKind {
    /// Builds the sink this selection describes.
    #[must_use]
    pub fn build(&self) -> Arc<dyn ResultSink> {
        match self {
            Self::Memory => Arc::new(MemorySink),
            Self::File {
                directory,
                chunk_size,
            } => {
                let sink = FileSink::new(directory.clone());
                Arc::new(match chunk_size {
                    Some(size) => sink.with_chunk_size(*size),
                    None => sink,
                })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_kind_defaults_to_memory() {
        assert_eq!(SinkKind::default(), SinkKind::Memory);
    }

    #[test]
    fn test_sink_kind_deserializes_tagged() {
        let kind: SinkKind =
            serde_json::from_str(r#"{"kind": "file", "directory": "out", "chunk_size": 4096}"#)
                .unwrap();
        assert_eq!(
            kind,
            SinkKind::File {
                directory: PathBuf::from("out"),
                chunk_size: Some(4096)
            }
        );
        let memory: SinkKind = serde_json::from_str(r#"{"kind": "memory"}"#).unwrap();
        assert_eq!(memory, SinkKind::Memory);
    }

    #[test]
    fn test_build_file_sink_validates_destinations() {
        let sink = SinkKind::File {
            directory: PathBuf::from("out"),
            chunk_size: None,
        }
        .build();
        let result = sink.validate(&[Request::get("https://example.com")]);
        assert!(matches!(result, Err(SinkError::MissingDestination { .. })));
    }

    #[test]
    fn test_build_memory_sink_accepts_anything() {
        let sink = SinkKind::Memory.build();
        assert!(sink.validate(&[Request::get("https://example.com")]).is_ok());
    }
}
