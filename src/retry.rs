//! Retry decisions for failed request attempts.
//!
//! This module provides the [`RetryPolicy`] and [`FailureType`] types for
//! classifying attempt errors and deciding whether a descriptor goes back
//! into the work queue.
//!
//! # Overview
//!
//! When an attempt fails, the error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - Temporary failures that may succeed on retry
//! - [`FailureType::Permanent`] - Failures that won't succeed regardless of retries
//! - [`FailureType::RateLimited`] - Server rate limiting (HTTP 429)
//!
//! The [`RetryPolicy`] then decides based on the attempt count and its
//! [`RetryOn`] mode. With [`RetryOn::AnyError`] (the default) every failure
//! is retried until the attempt budget is spent; with
//! [`RetryOn::TransientOnly`] permanent failures end the request at once.
//!
//! There is no backoff sleep: a retried request re-enters the queue tail and
//! waits its turn behind the rest of the batch.
//!
//! # Example
//!
//! ```
//! use concurrent_requests::{AttemptError, RetryDecision, RetryOn, RetryPolicy, TransportError};
//!
//! let policy = RetryPolicy::new(3, RetryOn::TransientOnly);
//! let error = AttemptError::from(TransportError::http_status("https://example.com/a", 503));
//!
//! match policy.should_retry(&error, 1) {
//!     RetryDecision::Retry { attempt } => println!("retrying as attempt {attempt}"),
//!     RetryDecision::DoNotRetry { reason } => println!("not retrying: {reason}"),
//! }
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::request::AttemptError;
use crate::sink::SinkError;
use crate::transport::TransportError;

/// Default number of attempts per request, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Which failures are eligible for another attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryOn {
    /// Retry every failed attempt until the budget is spent.
    #[default]
    AnyError,
    /// Retry only failures classified as transient or rate limited.
    TransientOnly,
}

/// Classification of attempt failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: network timeout, server disconnect, 5xx responses.
    Transient,

    /// Failure that won't succeed regardless of retries.
    ///
    /// Examples: 404 Not Found, invalid URL, unwritable destination.
    Permanent,

    /// Server rate limiting (HTTP 429).
    RateLimited,
}

impl FailureType {
    /// Whether another attempt could plausibly succeed.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transient | Self::RateLimited)
    }
}

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Requeue the request.
    Retry {
        /// The attempt number the retry will be (2 for the first retry).
        attempt: u32,
    },

    /// Record the request as failed.
    DoNotRetry {
        /// Human-readable reason.
        reason: String,
    },
}

/// Attempt budget and retry mode shared by every worker of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    retry_on: RetryOn,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_on: RetryOn::default(),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, retry_on: RetryOn) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_on,
        }
    }

    /// Creates a retry-anything policy with the given attempt budget.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self::new(max_attempts, RetryOn::AnyError)
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn retry_on(&self) -> RetryOn {
        self.retry_on
    }

    /// Decides whether a request whose `attempts`-th attempt failed with
    /// `error` should run again.
    #[instrument(skip(self, error), fields(max = self.max_attempts))]
    pub fn should_retry(&self, error: &AttemptError, attempts: u32) -> RetryDecision {
        if attempts >= self.max_attempts {
            debug!(attempts, "max attempts exhausted");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        if self.retry_on == RetryOn::TransientOnly {
            let failure_type = classify_error(error);
            if !failure_type.is_retryable() {
                debug!(?failure_type, "permanent failure, not retrying");
                return RetryDecision::DoNotRetry {
                    reason: "permanent failure".to_string(),
                };
            }
        }

        RetryDecision::Retry {
            attempt: attempts + 1,
        }
    }
}

/// Classifies an attempt error for retry decisions.
#[must_use]
pub fn classify_error(error: &AttemptError) -> FailureType {
    match error {
        AttemptError::Transport(e) => classify_transport(e),
        AttemptError::Sink(SinkError::Body(e)) => classify_transport(e),
        AttemptError::Sink(_) | AttemptError::Panicked { .. } => FailureType::Permanent,
    }
}

fn classify_transport(error: &TransportError) -> FailureType {
    match error {
        TransportError::Timeout { .. } | TransportError::Disconnected { .. } => {
            FailureType::Transient
        }
        TransportError::Network { source, .. } => {
            if source.is_builder() || source.is_redirect() {
                FailureType::Permanent
            } else {
                FailureType::Transient
            }
        }
        TransportError::HttpStatus { status, .. } => classify_http_status(*status),
        TransportError::InvalidUrl { .. } | TransportError::InvalidHeader { .. } => {
            FailureType::Permanent
        }
        TransportError::Other { .. } => FailureType::Transient,
    }
}

fn classify_http_status(status: u16) -> FailureType {
    match status {
        408 => FailureType::Transient,   // Request Timeout
        429 => FailureType::RateLimited, // Too Many Requests
        status if (400..500).contains(&status) => FailureType::Permanent,
        status if (500..600).contains(&status) => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn status(code: u16) -> AttemptError {
        AttemptError::from(TransportError::http_status("http://example.com", code))
    }

    // ==================== RetryPolicy Tests ====================

    #[test]
    fn test_retry_policy_default_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), DEFAULT_MAX_ATTEMPTS);
        assert_eq!(policy.retry_on(), RetryOn::AnyError);
    }

    #[test]
    fn test_retry_policy_max_attempts_minimum_is_one() {
        let policy = RetryPolicy::with_max_attempts(0);
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_retry_on_deserializes_snake_case() {
        let mode: RetryOn = serde_json::from_str(r#""transient_only""#).unwrap();
        assert_eq!(mode, RetryOn::TransientOnly);
    }

    // ==================== Error Classification Tests ====================

    #[test]
    fn test_classify_http_statuses() {
        assert_eq!(classify_error(&status(400)), FailureType::Permanent);
        assert_eq!(classify_error(&status(404)), FailureType::Permanent);
        assert_eq!(classify_error(&status(408)), FailureType::Transient);
        assert_eq!(classify_error(&status(429)), FailureType::RateLimited);
        assert_eq!(classify_error(&status(500)), FailureType::Transient);
        assert_eq!(classify_error(&status(503)), FailureType::Transient);
        assert_eq!(classify_error(&status(599)), FailureType::Transient);
    }

    #[test]
    fn test_classify_timeout_and_disconnect_transient() {
        let timeout = AttemptError::from(TransportError::timeout("http://example.com"));
        let dropped = AttemptError::from(TransportError::disconnected("http://example.com"));
        assert_eq!(classify_error(&timeout), FailureType::Transient);
        assert_eq!(classify_error(&dropped), FailureType::Transient);
    }

    #[test]
    fn test_classify_invalid_url_permanent() {
        let error = AttemptError::from(TransportError::invalid_url("not-a-url"));
        assert_eq!(classify_error(&error), FailureType::Permanent);
    }

    #[test]
    fn test_classify_sink_errors() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let io = AttemptError::from(SinkError::io("/path/to/file", io_err));
        assert_eq!(classify_error(&io), FailureType::Permanent);

        let body = AttemptError::from(SinkError::Body(TransportError::disconnected("u")));
        assert_eq!(classify_error(&body), FailureType::Transient);
    }

    #[test]
    fn test_classify_panic_permanent() {
        let error = AttemptError::Panicked {
            message: "boom".to_string(),
        };
        assert_eq!(classify_error(&error), FailureType::Permanent);
    }

    // ==================== Should Retry Decision Tests ====================

    #[test]
    fn test_any_error_retries_permanent_failures() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.should_retry(&status(404), 1),
            RetryDecision::Retry { attempt: 2 }
        );
    }

    #[test]
    fn test_transient_only_stops_on_permanent() {
        let policy = RetryPolicy::new(5, RetryOn::TransientOnly);
        let decision = policy.should_retry(&status(404), 1);
        assert!(matches!(decision, RetryDecision::DoNotRetry { .. }));
        if let RetryDecision::DoNotRetry { reason } = decision {
            assert!(reason.contains("permanent"));
        }
    }

    #[test]
    fn test_transient_only_retries_rate_limited() {
        let policy = RetryPolicy::new(5, RetryOn::TransientOnly);
        assert!(matches!(
            policy.should_retry(&status(429), 2),
            RetryDecision::Retry { attempt: 3 }
        ));
    }

    #[test]
    fn test_should_retry_respects_max_attempts() {
        let policy = RetryPolicy::with_max_attempts(3);
        let error = status(503);

        assert!(matches!(policy.should_retry(&error, 1), RetryDecision::Retry { .. }));
        assert!(matches!(policy.should_retry(&error, 2), RetryDecision::Retry { .. }));

        let decision = policy.should_retry(&error, 3);
        assert!(matches!(decision, RetryDecision::DoNotRetry { .. }));
        if let RetryDecision::DoNotRetry { reason } = decision {
            assert!(reason.contains("exhausted"));
        }
    }

    #[test]
    fn test_single_attempt_budget_never_retries() {
        let policy = RetryPolicy::with_max_attempts(1);
        assert!(matches!(
            policy.should_retry(&status(500), 1),
            RetryDecision::DoNotRetry { .. }
        ));
    }
}
