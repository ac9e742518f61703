//! Serializable executor settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{DEFAULT_WORKERS, ExecutorError, MAX_WORKERS, MIN_WORKERS};
use crate::retry::{DEFAULT_MAX_ATTEMPTS, RetryOn, RetryPolicy};
use crate::sink::SinkKind;

/// Pool size, retry budget, throttling and sink selection for a run.
///
/// Every field has a default, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Number of concurrent workers (1..=1024).
    pub workers: usize,
    /// Attempts per request including the first; values below 1 act as 1.
    pub max_attempts: u32,
    /// Pause each worker takes after finishing a request, in milliseconds.
    pub delay_ms: u64,
    /// Which failures are retried.
    pub retry_on: RetryOn,
    /// Where successful bodies go.
    pub sink: SinkKind,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay_ms: 0,
            retry_on: RetryOn::default(),
            sink: SinkKind::default(),
        }
    }
}

impl ExecutorConfig {
    /// Checks values that cannot be clamped.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::InvalidWorkers`] if `workers` is out of range.
    pub fn validate(&self) -> Result<(), ExecutorError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&self.workers) {
            return Err(ExecutorError::InvalidWorkers {
                value: self.workers,
            });
        }
        Ok(())
    }

    /// Throttling delay, or `None` when disabled.
    #[must_use]
    pub fn delay(&self) -> Option<Duration> {
        (self.delay_ms > 0).then(|| Duration::from_millis(self.delay_ms))
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.retry_on)
    }
}
