//! Concurrent Requests Library
//!
//! Bounded-concurrency execution of many independent HTTP requests, with
//! per-request retry and pluggable result handling (in-memory capture or
//! streaming to files).
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`request`] - Request descriptors and their outcomes
//! - [`transport`] - The HTTP capability and its reqwest implementation
//! - [`sink`] - Where successful response bodies go
//! - [`queue`] - FIFO work queue with a drain barrier
//! - [`retry`] - Retry decisions and error classification
//! - [`observer`] - Informational run events
//! - [`executor`] - The worker pool and result collection
//! - [`download`] - One-shot batch downloader built on the executor
//! - [`config`] - JSON configuration files

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod executor;
pub mod observer;
pub mod queue;
pub mod request;
pub mod retry;
pub mod sink;
pub mod transport;

mod worker;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use download::{BatchDownload, Broadcast, DownloadAllError};
pub use executor::{
    CollectError, DEFAULT_WORKERS, Executor, ExecutorBuilder, ExecutorConfig, ExecutorError,
    RunStats, RunSummary, TextEncoding,
};
pub use observer::{NoopObserver, RequestEvent, RequestObserver, TracingObserver};
pub use queue::{QueueError, QueueStats, WorkQueue};
pub use request::{
    AttemptError, Body, Destination, Method, Outcome, Request, RequestEntry, RequestFailure,
    RequestOptions,
};
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, FailureType, RetryDecision, RetryOn, RetryPolicy, classify_error,
};
pub use sink::{FileSink, MemorySink, ResultSink, SinkError, SinkKind};
pub use transport::{HttpClient, HttpClientConfig, HttpTransport, ResponseBody, TransportError};
