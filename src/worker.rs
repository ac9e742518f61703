//! The per-worker loop.
//!
//! Each worker repeatedly takes a job from the shared queue, runs one attempt
//! (transport then sink), routes the result through the retry policy and
//! acknowledges the job. A job is owned by exactly one worker between `get`
//! and `acknowledge`; retried jobs are re-queued before the acknowledgement so
//! the drain barrier never opens while work remains.
//!
//! Workers only stop at the cancellation token, which the executor triggers
//! after the queue has drained, so a worker is never cancelled while holding a
//! job.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::executor::RunStats;
use crate::observer::{RequestEvent, RequestObserver, dispatch};
use crate::queue::WorkQueue;
use crate::request::{AttemptError, Request, RequestFailure};
use crate::retry::{RetryDecision, RetryPolicy};
use crate::sink::ResultSink;
use crate::transport::HttpTransport;

/// A descriptor in flight plus its position in the caller's list.
#[derive(Debug)]
pub(crate) struct Job {
    pub(crate) slot: usize,
    pub(crate) request: Request,
}

/// Terminal descriptors, indexed by input position.
pub(crate) type Finished = Mutex<Vec<Option<Request>>>;

/// State shared by every worker of one run.
pub(crate) struct WorkerContext {
    pub(crate) queue: WorkQueue<Job>,
    pub(crate) transport: Arc<dyn HttpTransport>,
    pub(crate) sink: Arc<dyn ResultSink>,
    pub(crate) observer: Arc<dyn RequestObserver>,
    pub(crate) policy: RetryPolicy,
    pub(crate) delay: Option<Duration>,
    pub(crate) finished: Finished,
    pub(crate) stats: RunStats,
}

pub(crate) struct Worker {
    id: usize,
    context: Arc<WorkerContext>,
    cancel: CancellationToken,
}

impl Worker {
    pub(crate) fn new(id: usize, context: Arc<WorkerContext>, cancel: CancellationToken) -> Self {
        Self {
            id,
            context,
            cancel,
        }
    }

    /// Runs until cancelled.
    pub(crate) async fn run(self) {
        debug!(worker = self.id, "worker started");
        loop {
            let job = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                job = self.context.queue.get() => job,
            };

            self.process(job).await;

            if let Err(error) = self.context.queue.acknowledge() {
                warn!(worker = self.id, error = %error, "queue acknowledgement rejected");
            }

            if let Some(delay) = self.context.delay {
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }
        debug!(worker = self.id, "worker stopped");
    }

    async fn process(&self, job: Job) {
        let Job { slot, mut request } = job;
        let attempt = request.record_attempt();
        self.context.stats.increment_attempts();
        debug!(worker = self.id, url = %request.url(), attempt, "attempting request");

        let error = match self.attempt(&request).await {
            Ok(payload) => {
                request.record_success(payload);
                self.context.stats.increment_succeeded();
                self.observe(&RequestEvent::Success { request: &request });
                self.finish(slot, request);
                return;
            }
            Err(error) => error,
        };

        match self.context.policy.should_retry(&error, attempt) {
            RetryDecision::Retry { attempt: next } => {
                debug!(worker = self.id, url = %request.url(), next, error = %error, "requeueing request");
                self.context.stats.increment_retried();
                self.observe(&RequestEvent::Retry {
                    request: &request,
                    error: &error,
                });
                self.context.queue.put(Job { slot, request });
            }
            RetryDecision::DoNotRetry { reason } => {
                debug!(worker = self.id, url = %request.url(), %reason, "giving up on request");
                let failure = RequestFailure::new(&request, error);
                request.record_failure(failure.clone());
                self.context.stats.increment_failed();
                self.observe(&RequestEvent::Exhausted {
                    request: &request,
                    failure: &failure,
                });
                self.finish(slot, request);
            }
        }
    }

    /// One exchange: transport, then sink. Panics count as failed attempts.
    async fn attempt(&self, request: &Request) -> Result<Option<Bytes>, AttemptError> {
        let exchange = async {
            let body = self.context.transport.execute(request).await?;
            let payload = self.context.sink.consume(request, body).await?;
            Ok::<_, AttemptError>(payload)
        };
        AssertUnwindSafe(exchange)
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(AttemptError::panicked(payload.as_ref())))
    }

    fn observe(&self, event: &RequestEvent<'_>) {
        dispatch(self.context.observer.as_ref(), event);
    }

    fn finish(&self, slot: usize, request: Request) {
        let mut finished = self
            .context
            .finished
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = finished.get_mut(slot) {
            *entry = Some(request);
        } else {
            warn!(worker = self.id, slot, "finished request has no slot");
        }
    }
}
