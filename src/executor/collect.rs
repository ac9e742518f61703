//! Result collection after a run.
//!
//! Every method returns one entry per input descriptor, in input order.
//! Entries are `None` for failed requests, for requests whose bodies went to
//! a file sink, and for requests that never ran.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{CollectError, Executor};
use crate::request::{Request, RequestFailure};

/// How [`Executor::collect_text`] turns bytes into text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    /// Strict UTF-8; invalid input is an error.
    #[default]
    Utf8,
    /// UTF-8 with invalid sequences replaced by U+FFFD.
    Utf8Lossy,
    /// ISO-8859-1: every byte maps to the code point of the same value.
    Latin1,
}

impl TextEncoding {
    fn decode(self, index: usize, bytes: &[u8]) -> Result<String, CollectError> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|source| CollectError::Decode { index, source }),
            Self::Utf8Lossy => Ok(String::from_utf8_lossy(bytes).into_owned()),
            Self::Latin1 => Ok(bytes.iter().copied().map(char::from).collect()),
        }
    }
}

impl Executor {
    /// Returns the first recorded failure, in input order.
    ///
    /// # Errors
    ///
    /// Returns the [`RequestFailure`] of the first failed descriptor.
    pub fn raise_for_status(&self) -> Result<(), RequestFailure> {
        self.requests().iter().try_for_each(Request::raise_if_failed)
    }

    /// Captured bodies in input order.
    ///
    /// # Errors
    ///
    /// With `raise_on_failure`, returns the first [`RequestFailure`] before
    /// returning anything.
    pub fn collect(&self, raise_on_failure: bool) -> Result<Vec<Option<Bytes>>, RequestFailure> {
        if raise_on_failure {
            self.raise_for_status()?;
        }
        Ok(self
            .requests()
            .iter()
            .map(|request| request.content().cloned())
            .collect())
    }

    /// Captured bodies decoded as text.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Failed`] under `raise_on_failure`, or
    /// [`CollectError::Decode`] for a body the encoding rejects.
    pub fn collect_text(
        &self,
        encoding: TextEncoding,
        raise_on_failure: bool,
    ) -> Result<Vec<Option<String>>, CollectError> {
        self.collect(raise_on_failure)?
            .into_iter()
            .enumerate()
            .map(|(index, body)| {
                body.map(|bytes| encoding.decode(index, &bytes)).transpose()
            })
            .collect()
    }

    /// Captured bodies parsed as JSON values.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Failed`] under `raise_on_failure`, or
    /// [`CollectError::Json`] for a body that is not valid JSON.
    pub fn collect_json(&self, raise_on_failure: bool) -> Result<Vec<Option<Value>>, CollectError> {
        self.collect_json_as(raise_on_failure)
    }

    /// Captured bodies deserialized into `T`.
    ///
    /// # Errors
    ///
    /// Same as [`collect_json`](Self::collect_json), with `T`'s shape checked
    /// as well.
    pub fn collect_json_as<T: DeserializeOwned>(
        &self,
        raise_on_failure: bool,
    ) -> Result<Vec<Option<T>>, CollectError> {
        self.collect(raise_on_failure)?
            .into_iter()
            .enumerate()
            .map(|(index, body)| {
                body.map(|bytes| {
                    serde_json::from_slice(&bytes)
                        .map_err(|source| CollectError::Json { index, source })
                })
                .transpose()
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::transport::{HttpTransport, ResponseBody, TransportError};

    /// Answers with whatever follows `mem://`; `mem://fail` times out.
    struct EchoTransport;

    #[async_trait]
    impl HttpTransport for EchoTransport {
        async fn execute(&self, request: &Request) -> Result<ResponseBody, TransportError> {
            let body = request
                .url()
                .strip_prefix("mem://")
                .unwrap_or_default()
                .to_string();
            if body == "fail" {
                return Err(TransportError::timeout(request.url()));
            }
            Ok(ResponseBody::from_bytes(200, body))
        }
    }

    async fn run(bodies: &[&str]) -> Executor {
        let requests = bodies
            .iter()
            .map(|body| Request::get(format!("mem://{body}")))
            .collect();
        let mut executor = Executor::builder(Arc::new(EchoTransport), requests)
            .max_attempts(1)
            .build()
            .unwrap();
        executor.run().await.unwrap();
        executor
    }

    #[test]
    fn test_latin1_maps_every_byte() {
        let text = TextEncoding::Latin1.decode(0, &[0x63, 0x61, 0x66, 0xE9]).unwrap();
        assert_eq!(text, "café");
    }

    #[test]
    fn test_strict_utf8_rejects_invalid() {
        let result = TextEncoding::Utf8.decode(4, &[0xFF, 0xFE]);
        assert!(matches!(result, Err(CollectError::Decode { index: 4, .. })));
        let lossy = TextEncoding::Utf8Lossy.decode(4, &[b'a', 0xFF]).unwrap();
        assert_eq!(lossy, "a\u{FFFD}");
    }

    #[test]
    fn test_collect_before_run_is_all_none() {
        let executor = Executor::new(
            Arc::new(EchoTransport),
            vec![Request::get("mem://a"), Request::get("mem://b")],
        );
        assert_eq!(executor.collect(true).unwrap(), vec![None, None]);
        assert!(executor.raise_for_status().is_ok());
    }

    #[tokio::test]
    async fn test_collect_text_keeps_order_and_failures_as_none() {
        let executor = run(&["first", "fail", "third"]).await;

        let texts = executor.collect_text(TextEncoding::Utf8, false).unwrap();
        assert_eq!(
            texts,
            vec![Some("first".to_string()), None, Some("third".to_string())]
        );
    }

    #[tokio::test]
    async fn test_collect_raises_first_failure() {
        let executor = run(&["ok", "fail"]).await;

        let failure = executor.collect(true).unwrap_err();
        assert_eq!(failure.url(), "mem://fail");
        assert!(matches!(
            executor.collect_json(true),
            Err(CollectError::Failed(_))
        ));
        assert!(executor.raise_for_status().is_err());
    }

    #[tokio::test]
    async fn test_collect_json_parses_values() {
        let executor = run(&["1", "[true]", "fail"]).await;

        let values = executor.collect_json(false).unwrap();
        assert_eq!(
            values,
            vec![
                Some(serde_json::json!(1)),
                Some(serde_json::json!([true])),
                None
            ]
        );
    }

    #[tokio::test]
    async fn test_collect_json_reports_bad_index() {
        let executor = run(&["1", "not-json"]).await;
        let error = executor.collect_json(false).unwrap_err();
        assert_eq!(error.index(), Some(1));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Count(u32);

    #[tokio::test]
    async fn test_collect_json_as_typed() {
        let executor = run(&["7", "9"]).await;
        let counts: Vec<Option<Count>> = executor.collect_json_as(true).unwrap();
        assert_eq!(counts, vec![Some(Count(7)), Some(Count(9))]);
    }
}
