//! Request descriptors: immutable request intent plus mutable execution state.
//!
//! A [`Request`] is created by the caller, handed to the
//! [`Executor`](crate::Executor) for the duration of a run, and read back
//! afterwards. Between dequeue and acknowledgement exactly one worker owns a
//! descriptor, so its state is mutated without locking.
//!
//! # Example
//!
//! ```
//! use concurrent_requests::request::{Method, Request};
//!
//! let request = Request::post("https://example.com/api")
//!     .with_header("Accept", "application/json")
//!     .with_json(serde_json::json!({"id": 7}))
//!     .save_as("result.json");
//!
//! assert_eq!(request.method(), Method::Post);
//! assert_eq!(request.file_name(), Some("result.json"));
//! assert_eq!(request.attempts(), 0);
//! assert!(request.is_pending());
//! ```

mod entry;
mod failure;
mod method;

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use serde_json::{Map, Value};
use tracing::warn;

pub use entry::RequestEntry;
pub use failure::{AttemptError, RequestFailure};
pub use method::Method;

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Raw bytes sent as-is.
    Bytes(Bytes),
    /// UTF-8 text.
    Text(String),
    /// JSON document, sent with `Content-Type: application/json`.
    Json(Value),
    /// URL-encoded form fields.
    Form(Vec<(String, String)>),
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Self::Text(text) => f.write_str(text),
            Self::Json(value) => write!(f, "{value}"),
            Self::Form(fields) => {
                let rendered: Vec<String> = fields.iter().map(|(k, v)| format!("{k}={v}")).collect();
                f.write_str(&rendered.join("&"))
            }
        }
    }
}

/// Per-request options.
///
/// `timeout` is interpreted by [`HttpClient`](crate::HttpClient). `extra` is an
/// opaque bag handed to the transport untouched; the executor never reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Total timeout for this request, overriding the client's read timeout.
    pub timeout: Option<Duration>,
    /// Transport-specific pass-through values.
    pub extra: Map<String, Value>,
}

/// Where a successful response body goes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Destination {
    /// Captured in memory and stored on the descriptor.
    #[default]
    Memory,
    /// Streamed to a named file inside the sink's directory.
    Named(String),
}

/// Execution outcome of a descriptor.
///
/// Transitions only `Pending -> Succeeded` or `Pending -> Failed`.
#[derive(Debug, Clone, Default)]
pub enum Outcome {
    /// Not yet terminal.
    #[default]
    Pending,
    /// Completed; holds the body for in-memory capture, `None` when persisted.
    Succeeded(Option<Bytes>),
    /// Attempts exhausted.
    Failed(RequestFailure),
}

impl Outcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
        }
    }
}

/// One unit of request intent plus its execution and result state.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: String,
    params: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<Body>,
    options: RequestOptions,
    destination: Destination,
    attempts: u32,
    outcome: Outcome,
}

impl Request {
    /// Creates a pending descriptor for `method` and `url`.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: Vec::new(),
            headers: Vec::new(),
            body: None,
            options: RequestOptions::default(),
            destination: Destination::Memory,
            attempts: 0,
            outcome: Outcome::Pending,
        }
    }

    /// `GET` descriptor.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// `POST` descriptor.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    /// `PUT` descriptor.
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    /// `PATCH` descriptor.
    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::Patch, url)
    }

    /// `DELETE` descriptor.
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    /// `OPTIONS` descriptor.
    pub fn options(url: impl Into<String>) -> Self {
        Self::new(Method::Options, url)
    }

    /// `HEAD` descriptor.
    pub fn head(url: impl Into<String>) -> Self {
        Self::new(Method::Head, url)
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Appends a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn with_json(self, value: Value) -> Self {
        self.with_body(Body::Json(value))
    }

    /// Sets a text body.
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_body(Body::Text(text.into()))
    }

    /// Sets a URL-encoded form body.
    #[must_use]
    pub fn with_form<K, V>(self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.with_body(Body::Form(fields))
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Adds a transport pass-through option.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.extra.insert(key.into(), value);
        self
    }

    /// Persists the response under `file_name` instead of capturing it in memory.
    #[must_use]
    pub fn save_as(mut self, file_name: impl Into<String>) -> Self {
        self.destination = Destination::Named(file_name.into());
        self
    }

    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Per-request options (timeout and pass-through extras).
    #[must_use]
    pub fn request_options(&self) -> &RequestOptions {
        &self.options
    }

    #[must_use]
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Destination file name, if the descriptor is persisted.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        match &self.destination {
            Destination::Named(name) => Some(name),
            Destination::Memory => None,
        }
    }

    /// Number of execution attempts so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self.outcome, Outcome::Pending)
    }

    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        matches!(self.outcome, Outcome::Succeeded(_))
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed(_))
    }

    /// Captured response body; `None` unless succeeded with in-memory capture.
    #[must_use]
    pub fn content(&self) -> Option<&Bytes> {
        match &self.outcome {
            Outcome::Succeeded(payload) => payload.as_ref(),
            _ => None,
        }
    }

    /// Stored failure, if attempts were exhausted.
    #[must_use]
    pub fn error(&self) -> Option<&RequestFailure> {
        match &self.outcome {
            Outcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Counts one execution attempt and returns the new total.
    pub fn record_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Marks the descriptor succeeded.
    ///
    /// `payload` is the captured body for in-memory capture and `None` when
    /// the body was already streamed to storage. Ignored unless pending.
    pub fn record_success(&mut self, payload: Option<Bytes>) {
        if self.guard_terminal("success") {
            self.outcome = Outcome::Succeeded(payload);
        }
    }

    /// Marks the descriptor failed. Ignored unless pending.
    pub fn record_failure(&mut self, failure: RequestFailure) {
        if self.guard_terminal("failure") {
            self.outcome = Outcome::Failed(failure);
        }
    }

    /// Returns the stored failure, if any.
    ///
    /// # Errors
    ///
    /// Returns the [`RequestFailure`] recorded when attempts were exhausted.
    pub fn raise_if_failed(&self) -> Result<(), RequestFailure> {
        match &self.outcome {
            Outcome::Failed(failure) => Err(failure.clone()),
            _ => Ok(()),
        }
    }

    fn guard_terminal(&self, transition: &str) -> bool {
        if self.is_pending() {
            return true;
        }
        warn!(
            url = %self.url,
            outcome = self.outcome.label(),
            transition,
            "ignoring outcome change on terminal request"
        );
        false
    }
}
