//! Bounded-concurrency executor for a batch of requests.
//!
//! This module provides the [`Executor`] which owns a list of request
//! descriptors, runs them through a pool of workers sharing one
//! [`WorkQueue`], and exposes the results afterwards.
//!
//! # Overview
//!
//! [`Executor::run`]:
//! 1. Validates the descriptors against the sink (fails before any request)
//! 2. Prepares the sink's storage
//! 3. Spawns the workers and seeds the queue in input order
//! 4. Waits for the queue's drain barrier
//! 5. Cancels the workers, waits for them to stop and restores the
//!    descriptors in input order
//!
//! Individual request failures never abort a run. They are recorded on the
//! descriptors and surfaced on demand through [`Executor::collect`],
//! [`Executor::raise_for_status`] and friends.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use concurrent_requests::{Executor, HttpClient, Request};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let requests = (1..=3)
//!     .map(|page| Request::get("https://example.com/items").with_param("page", page.to_string()))
//!     .collect();
//!
//! let mut executor = Executor::builder(Arc::new(HttpClient::new()), requests)
//!     .workers(2)
//!     .max_attempts(3)
//!     .build()?;
//! let summary = executor.run().await?;
//! println!("{} succeeded, {} failed", summary.succeeded, summary.failed);
//!
//! for body in executor.collect_text(Default::default(), true)? {
//!     println!("{}", body.unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

mod collect;
mod config;
mod error;
mod stats;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::observer::{NoopObserver, RequestEvent, RequestObserver, dispatch};
use crate::queue::WorkQueue;
use crate::request::Request;
use crate::retry::{RetryOn, RetryPolicy};
use crate::sink::{ResultSink, SinkKind};
use crate::transport::HttpTransport;
use crate::worker::{Job, Worker, WorkerContext};

pub use collect::TextEncoding;
pub use config::ExecutorConfig;
pub use error::{CollectError, ExecutorError};
pub use stats::{RunStats, RunSummary};

/// Minimum allowed worker count.
pub const MIN_WORKERS: usize = 1;

/// Maximum allowed worker count.
pub const MAX_WORKERS: usize = 1024;

/// Default worker count if not specified.
pub const DEFAULT_WORKERS: usize = 5;

/// Runs a batch of requests with a fixed-size worker pool.
///
/// # Concurrency Model
///
/// - Each worker runs in its own Tokio task
/// - At most `workers` requests are in flight at any time
/// - A failed attempt re-enters the queue tail until the retry budget is
///   spent
/// - Workers are cancelled only after every request reached a terminal state
///
/// An executor runs once; build a new one for another batch.
///
/// Dropping the [`run`](Self::run) future before it completes stops the
/// workers after their in-flight attempt and discards the descriptors that
/// were still in the pool; the executor then counts as having run.
pub struct Executor {
    transport: Arc<dyn HttpTransport>,
    requests: Vec<Request>,
    workers: usize,
    policy: RetryPolicy,
    delay: Option<Duration>,
    sink: Arc<dyn ResultSink>,
    observer: Arc<dyn RequestObserver>,
    started: bool,
    summary: Option<RunSummary>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("requests", &self.requests.len())
            .field("workers", &self.workers)
            .field("policy", &self.policy)
            .field("delay", &self.delay)
            .field("sink", &self.sink)
            .field("started", &self.started)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

impl Executor {
    /// Creates an executor with default settings: 5 workers, 5 attempts, no
    /// delay, in-memory capture.
    pub fn new(transport: Arc<dyn HttpTransport>, requests: Vec<Request>) -> Self {
        let config = ExecutorConfig::default();
        Self {
            transport,
            requests,
            workers: config.workers,
            policy: config.retry_policy(),
            delay: config.delay(),
            sink: config.sink.build(),
            observer: Arc::new(NoopObserver),
            started: false,
            summary: None,
        }
    }

    /// Starts building an executor for `requests`.
    pub fn builder(transport: Arc<dyn HttpTransport>, requests: Vec<Request>) -> ExecutorBuilder {
        ExecutorBuilder::new(transport, requests)
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The descriptors, in input order.
    #[must_use]
    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    /// Gives the descriptors back, in input order.
    #[must_use]
    pub fn into_requests(self) -> Vec<Request> {
        self.requests
    }

    /// Counters of the completed run, if it ran.
    #[must_use]
    pub fn summary(&self) -> Option<RunSummary> {
        self.summary
    }

    /// Executes every request until each one succeeded or ran out of
    /// attempts.
    ///
    /// # Errors
    ///
    /// - [`ExecutorError::AlreadyRun`] if called a second time, including
    ///   after an earlier `run` future was dropped
    /// - [`ExecutorError::Configuration`] if the sink rejects a descriptor;
    ///   no request is issued in that case
    /// - [`ExecutorError::Sink`] if the sink cannot prepare its storage
    ///
    /// Individual request failures do NOT cause this method to error.
    #[instrument(skip(self), fields(requests = self.requests.len(), workers = self.workers))]
    pub async fn run(&mut self) -> Result<RunSummary, ExecutorError> {
        if self.started {
            return Err(ExecutorError::AlreadyRun);
        }

        self.sink
            .validate(&self.requests)
            .map_err(ExecutorError::Configuration)?;
        self.sink.prepare().await.map_err(ExecutorError::Sink)?;

        let total = self.requests.len();
        let context = Arc::new(WorkerContext {
            queue: WorkQueue::new(),
            transport: Arc::clone(&self.transport),
            sink: Arc::clone(&self.sink),
            observer: Arc::clone(&self.observer),
            policy: self.policy,
            delay: self.delay,
            finished: Mutex::new((0..total).map(|_| None).collect()),
            stats: RunStats::new(),
        });

        self.started = true;
        let cancel = CancellationToken::new();
        // Stops the workers if this future is dropped before the drain.
        let stop_on_drop = cancel.clone().drop_guard();
        let handles: Vec<_> = (0..self.workers)
            .map(|id| {
                let worker = Worker::new(id, Arc::clone(&context), cancel.child_token());
                tokio::spawn(worker.run())
            })
            .collect();

        for (slot, request) in std::mem::take(&mut self.requests).into_iter().enumerate() {
            context.queue.put(Job { slot, request });
        }
        info!(total, "starting to request");
        dispatch(self.observer.as_ref(), &RequestEvent::Start { total });

        context.queue.join().await;
        debug!("queue drained, stopping workers");
        drop(stop_on_drop);
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "worker task ended abnormally");
            }
        }

        let finished = std::mem::take(
            &mut *context
                .finished
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        self.requests = finished
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.ok_or(ExecutorError::MissingResult { index }))
            .collect::<Result<_, _>>()?;

        let summary = context.stats.summary(total);
        self.summary = Some(summary);
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            retried = summary.retried,
            attempts = summary.attempts,
            "all requests were completed"
        );
        dispatch(self.observer.as_ref(), &RequestEvent::End { summary: &summary });

        Ok(summary)
    }
}

/// Builder for [`Executor`].
pub struct ExecutorBuilder {
    transport: Arc<dyn HttpTransport>,
    requests: Vec<Request>,
    config: ExecutorConfig,
    sink: Option<Arc<dyn ResultSink>>,
    observer: Arc<dyn RequestObserver>,
}

impl ExecutorBuilder {
    fn new(transport: Arc<dyn HttpTransport>, requests: Vec<Request>) -> Self {
        Self {
            transport,
            requests,
            config: ExecutorConfig::default(),
            sink: None,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Replaces every setting with `config`.
    #[must_use]
    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the worker count (validated by [`build`](Self::build)).
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Sets attempts per request; values below 1 act as 1.
    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.max_attempts = max_attempts;
        self
    }

    /// Sets the pause each worker takes after finishing a request.
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.config.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn retry_on(mut self, retry_on: RetryOn) -> Self {
        self.config.retry_on = retry_on;
        self
    }

    /// Selects one of the built-in sinks.
    #[must_use]
    pub fn sink_kind(mut self, kind: SinkKind) -> Self {
        self.config.sink = kind;
        self.sink = None;
        self
    }

    /// Uses a custom sink, overriding the configured kind.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Builds the executor.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::InvalidWorkers`] if the worker count is
    /// outside 1..=1024.
    pub fn build(self) -> Result<Executor, ExecutorError> {
        self.config.validate()?;
        let sink = self.sink.unwrap_or_else(|| self.config.sink.build());

        debug!(
            workers = self.config.workers,
            max_attempts = self.config.max_attempts,
            delay_ms = self.config.delay_ms,
            retry_on = ?self.config.retry_on,
            "creating executor"
        );

        Ok(Executor {
            transport: self.transport,
            requests: self.requests,
            workers: self.config.workers,
            policy: self.config.retry_policy(),
            delay: self.config.delay(),
            sink,
            observer: self.observer,
            started: false,
            summary: None,
        })
    }
}
