//! File-backed result sink.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};

use super::{ResultSink, SinkError};
use crate::request::Request;
use crate::transport::ResponseBody;

/// Default write chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Streams each response body into `directory/<file_name>`.
///
/// Every descriptor must carry a destination name; names must be a single
/// plain path component and unique within a run. A body that fails mid-copy
/// leaves no partial file behind.
#[derive(Debug, Clone)]
pub struct FileSink {
    directory: PathBuf,
    chunk_size: usize,
}

impl FileSink {
    /// Creates a sink writing into `directory` with the default chunk size.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Sets the write chunk size (minimum 1 byte).
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Path a descriptor's body is written to.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the descriptor has no usable name.
    pub fn destination_path(&self, request: &Request) -> Result<PathBuf, SinkError> {
        let name = request
            .file_name()
            .ok_or_else(|| SinkError::missing_destination(request.url()))?;
        if !is_plain_file_name(name) {
            return Err(SinkError::invalid_destination(request.url(), name));
        }
        Ok(self.directory.join(name))
    }

    async fn copy_body(&self, file: File, body: ResponseBody, path: &Path) -> Result<u64, SinkError> {
        let mut writer = BufWriter::with_capacity(self.chunk_size, file);
        let mut stream = body.into_stream();
        let mut bytes_written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for piece in chunk.chunks(self.chunk_size) {
                writer
                    .write_all(piece)
                    .await
                    .map_err(|e| SinkError::io(path, e))?;
            }
            bytes_written += chunk.len() as u64;
        }

        writer.flush().await.map_err(|e| SinkError::io(path, e))?;
        Ok(bytes_written)
    }
}

#[async_trait]
impl ResultSink for FileSink {
    fn validate(&self, requests: &[Request]) -> Result<(), SinkError> {
        let mut seen = HashSet::with_capacity(requests.len());
        for request in requests {
            let path = self.destination_path(request)?;
            if !seen.insert(path) {
                let name = request.file_name().unwrap_or_default();
                return Err(SinkError::invalid_destination(request.url(), name));
            }
        }
        Ok(())
    }

    async fn prepare(&self) -> Result<(), SinkError> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| SinkError::io(&self.directory, e))
    }

    #[instrument(skip(self, request, body), fields(url = %request.url()))]
    async fn consume(
        &self,
        request: &Request,
        body: ResponseBody,
    ) -> Result<Option<Bytes>, SinkError> {
        let path = self.destination_path(request)?;
        let file = File::create(&path)
            .await
            .map_err(|e| SinkError::io(&path, e))?;

        match self.copy_body(file, body, &path).await {
            Ok(bytes) => {
                debug!(path = %path.display(), bytes, "response persisted");
                Ok(None)
            }
            Err(error) => {
                debug!(path = %path.display(), "cleaning up partial file after error");
                let _ = tokio::fs::remove_file(&path).await;
                Err(error)
            }
        }
    }
}

/// Whether `name` is exactly one normal path component.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
