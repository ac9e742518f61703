//! Run counters.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

/// Live counters updated by workers during a run.
///
/// Uses atomic counters so every worker can update them without locking.
#[derive(Debug, Default)]
pub struct RunStats {
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    retried: AtomicUsize,
    attempts: AtomicU64,
}

impl RunStats {
    /// Creates a tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Number of re-enqueues performed.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried.load(Ordering::SeqCst)
    }

    /// Number of attempts started, first attempts included.
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn increment_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_retried(&self) {
        self.retried.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_attempts(&self) {
        self.attempts.fetch_add(1, Ordering::SeqCst);
    }

    /// Snapshot of the counters for a run of `total` requests.
    #[must_use]
    pub fn summary(&self, total: usize) -> RunSummary {
        RunSummary {
            total,
            succeeded: self.succeeded(),
            failed: self.failed(),
            retried: self.retried(),
            attempts: self.attempts(),
        }
    }
}

/// Final counters of a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Requests in the run.
    pub total: usize,
    /// Requests that ended succeeded.
    pub succeeded: usize,
    /// Requests that ended failed.
    pub failed: usize,
    /// Re-enqueues performed.
    pub retried: usize,
    /// Attempts started.
    pub attempts: u64,
}

impl RunSummary {
    /// Whether every request succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.succeeded == self.total
    }
}
