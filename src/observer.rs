//! Run observation hooks.
//!
//! An executor reports what happens to each request through a
//! [`RequestObserver`]. Observers are informational: they never influence
//! retry decisions or outcomes, and a panicking observer is contained so the
//! worker still finishes and acknowledges the request it holds.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{info, warn};

use crate::executor::RunSummary;
use crate::request::{AttemptError, Request, RequestFailure};

/// Something that happened during a run.
#[derive(Debug, Clone, Copy)]
pub enum RequestEvent<'a> {
    /// Workers are up and `total` requests have been queued.
    Start {
        /// Number of requests in the run.
        total: usize,
    },
    /// A request completed and its body reached the sink.
    Success {
        /// The finished request.
        request: &'a Request,
    },
    /// An attempt failed and the request went back into the queue.
    Retry {
        /// The request being retried.
        request: &'a Request,
        /// Error from the failed attempt.
        error: &'a AttemptError,
    },
    /// The request ran out of attempts and was recorded as failed.
    Exhausted {
        /// The failed request.
        request: &'a Request,
        /// The recorded failure.
        failure: &'a RequestFailure,
    },
    /// Every request reached a terminal state.
    End {
        /// Final counters of the run.
        summary: &'a RunSummary,
    },
}

impl<'a> RequestEvent<'a> {
    /// Short lowercase label for the event.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Success { .. } => "success",
            Self::Retry { .. } => "retry",
            Self::Exhausted { .. } => "exhausted",
            Self::End { .. } => "end",
        }
    }

    /// The request the event concerns, if it is a per-request event.
    #[must_use]
    pub fn request(&self) -> Option<&'a Request> {
        match *self {
            Self::Success { request }
            | Self::Retry { request, .. }
            | Self::Exhausted { request, .. } => Some(request),
            Self::Start { .. } | Self::End { .. } => None,
        }
    }
}

/// Receives run events. Shared by every worker, so it must be thread-safe.
pub trait RequestObserver: Send + Sync {
    fn observe(&self, event: &RequestEvent<'_>);
}

impl<F> RequestObserver for F
where
    F: Fn(&RequestEvent<'_>) + Send + Sync,
{
    fn observe(&self, event: &RequestEvent<'_>) {
        self(event);
    }
}

/// Observer that ignores everything. The executor default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RequestObserver for NoopObserver {
    fn observe(&self, _event: &RequestEvent<'_>) {}
}

/// Observer that writes one `tracing` record per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RequestObserver for TracingObserver {
    fn observe(&self, event: &RequestEvent<'_>) {
        match event {
            RequestEvent::Start { total } => info!(total, "starting to request"),
            RequestEvent::Success { request } => {
                info!(
                    method = %request.method(),
                    url = %request.url(),
                    data = %body_text(request),
                    params = ?request.params(),
                    headers = ?request.headers(),
                    attempts = request.attempts(),
                    "successful request"
                );
            }
            RequestEvent::Retry { request, error } => {
                info!(
                    method = %request.method(),
                    url = %request.url(),
                    data = %body_text(request),
                    params = ?request.params(),
                    headers = ?request.headers(),
                    attempts = request.attempts(),
                    error = %error,
                    "retrying request"
                );
            }
            RequestEvent::Exhausted { request, failure } => {
                info!(
                    method = %request.method(),
                    url = %request.url(),
                    data = %body_text(request),
                    params = ?request.params(),
                    headers = ?request.headers(),
                    attempts = failure.attempts(),
                    error = %failure.cause(),
                    "bad request"
                );
            }
            RequestEvent::End { summary } => info!(
                succeeded = summary.succeeded,
                failed = summary.failed,
                retried = summary.retried,
                "all requests were completed"
            ),
        }
    }
}

fn body_text(request: &Request) -> String {
    request.body().map(ToString::to_string).unwrap_or_default()
}

/// Delivers `event`, containing any panic raised by the observer.
pub(crate) fn dispatch(observer: &dyn RequestObserver, event: &RequestEvent<'_>) {
    let delivered = catch_unwind(AssertUnwindSafe(|| observer.observe(event)));
    if let Err(payload) = delivered {
        let message = AttemptError::panicked(payload.as_ref());
        warn!(event = event.kind(), error = %message, "observer panicked; event dropped");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::transport::TransportError;

    #[test]
    fn test_event_kind_and_request() {
        let request = Request::get("https://example.com");
        let success = RequestEvent::Success { request: &request };
        assert_eq!(success.kind(), "success");
        assert_eq!(success.request().unwrap().url(), "https://example.com");

        let start = RequestEvent::Start { total: 3 };
        assert_eq!(start.kind(), "start");
        assert!(start.request().is_none());
    }

    #[test]
    fn test_closure_observer_receives_events() {
        let seen = Mutex::new(Vec::new());
        let observer = |event: &RequestEvent<'_>| seen.lock().unwrap().push(event.kind());

        let request = Request::get("https://example.com");
        let error = AttemptError::from(TransportError::timeout("https://example.com"));
        dispatch(&observer, &RequestEvent::Start { total: 1 });
        dispatch(
            &observer,
            &RequestEvent::Retry {
                request: &request,
                error: &error,
            },
        );

        assert_eq!(*seen.lock().unwrap(), vec!["start", "retry"]);
    }

    #[test]
    fn test_dispatch_contains_observer_panic() {
        let observer = |_: &RequestEvent<'_>| panic!("observer exploded");
        dispatch(&observer, &RequestEvent::Start { total: 0 });
    }

    #[test]
    fn test_tracing_observer_handles_every_event() {
        let request = Request::post("https://example.com/items")
            .with_text("payload")
            .with_param("page", "1");
        let error = AttemptError::from(TransportError::disconnected("https://example.com/items"));
        let failure = RequestFailure::new(&request, AttemptError::from(TransportError::timeout("u")));
        let summary = RunSummary::default();

        let observer = TracingObserver;
        observer.observe(&RequestEvent::Start { total: 1 });
        observer.observe(&RequestEvent::Success { request: &request });
        observer.observe(&RequestEvent::Retry {
            request: &request,
            error: &error,
        });
        observer.observe(&RequestEvent::Exhausted {
            request: &request,
            failure: &failure,
        });
        observer.observe(&RequestEvent::End { summary: &summary });
    }
}
