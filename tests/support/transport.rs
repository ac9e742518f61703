//! Scripted in-process transport for deterministic failure injection.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use concurrent_requests::{HttpTransport, Request, ResponseBody, TransportError};

/// What one call for a URL does.
#[derive(Debug, Clone)]
pub enum Step {
    /// Answer 200 with the URL as body.
    Echo,
    /// Answer 200 with this body.
    Respond(Bytes),
    /// Fail with an HTTP status error.
    Status(u16),
    Timeout,
    Disconnect,
    /// Send one chunk, then drop the connection mid-body.
    BrokenBody(Bytes),
    Panic,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Plays per-URL scripts; once a script runs out every call answers
/// [`Step::Echo`].
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    latency: Duration,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queues `steps` for calls to `url`.
    pub fn script(self, url: &str, steps: impl IntoIterator<Item = Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .extend(steps);
        self
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// URLs in the order calls started.
    pub fn call_log(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_step(&self, url: &str) -> Step {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Step::Echo)
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: &Request) -> Result<ResponseBody, TransportError> {
        let url = request.url().to_string();
        self.calls.lock().unwrap().push(url.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match self.next_step(&url) {
            Step::Echo => Ok(ResponseBody::from_bytes(200, url)),
            Step::Respond(body) => Ok(ResponseBody::from_bytes(200, body)),
            Step::Status(status) => Err(TransportError::http_status(url, status)),
            Step::Timeout => Err(TransportError::timeout(url)),
            Step::Disconnect => Err(TransportError::disconnected(url)),
            Step::BrokenBody(first) => Ok(ResponseBody::from_chunks(
                200,
                vec![Ok(first), Err(TransportError::disconnected(url))],
            )),
            Step::Panic => panic!("scripted transport panic for {url}"),
        }
    }
}
