//! In-memory result sink.

use async_trait::async_trait;
use bytes::Bytes;

use super::{ResultSink, SinkError};
use crate::request::Request;
use crate::transport::ResponseBody;

/// Buffers the full response body and hands it back to the descriptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemorySink;

#[async_trait]
impl ResultSink for MemorySink {
    async fn consume(
        &self,
        _request: &Request,
        body: ResponseBody,
    ) -> Result<Option<Bytes>, SinkError> {
        Ok(Some(body.read_all().await?))
    }
}
