//! Retry logic.
//!
//! # Responsibilities
//! - Classify the outcome of one attempt
//! - Decide whether the outcome is the backend's fault
//! - Bound the number of attempts per request
//!
//! # Precedence
//! ```text
//! forward error + client gone  → ClientGone   (not retried, not charged)
//! forward error                → Transport    (charged, retried)
//! non-2xx status               → BadStatus    (charged, retried)
//! nothing written              → Silent       (charged, retried)
//! 2xx status                   → Success
//! ```

use axum::http::StatusCode;

/// Attempts per request when nothing else is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Result of a single attempt against a single backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Backend answered 2xx; the response has been committed.
    Success(StatusCode),
    /// The client went away while the attempt was in flight.
    ClientGone,
    /// Connect error, reset, timeout or any other transport failure.
    Transport,
    /// Backend answered outside the 2xx range.
    BadStatus(StatusCode),
    /// Transport reported no error but no response was produced.
    Silent,
}

impl AttemptOutcome {
    /// Classify an attempt from its raw signals.
    pub fn classify(
        transport_failed: bool,
        client_gone: bool,
        written: Option<StatusCode>,
    ) -> Self {
        if transport_failed {
            return if client_gone {
                AttemptOutcome::ClientGone
            } else {
                AttemptOutcome::Transport
            };
        }
        match written {
            Some(status) if status.is_success() => AttemptOutcome::Success(status),
            Some(status) => AttemptOutcome::BadStatus(status),
            None => AttemptOutcome::Silent,
        }
    }

    /// True when the outcome must be recorded against the backend's breaker.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            AttemptOutcome::Transport | AttemptOutcome::BadStatus(_) | AttemptOutcome::Silent
        )
    }

    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success(_) => "success",
            AttemptOutcome::ClientGone => "client_gone",
            AttemptOutcome::Transport => "transport_error",
            AttemptOutcome::BadStatus(_) => "bad_status",
            AttemptOutcome::Silent => "silent",
        }
    }
}

/// Bounded retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Whether another attempt may start after `attempts` failed ones.
    pub fn allows(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_takes_precedence() {
        let outcome = AttemptOutcome::classify(true, true, Some(StatusCode::OK));
        assert_eq!(outcome, AttemptOutcome::ClientGone);
        assert!(!outcome.is_backend_failure());
    }

    #[test]
    fn client_gone_without_error_is_not_cancellation() {
        // The backend answered before we noticed the client left.
        let outcome = AttemptOutcome::classify(false, true, Some(StatusCode::OK));
        assert_eq!(outcome, AttemptOutcome::Success(StatusCode::OK));
    }

    #[test]
    fn transport_error_is_backend_failure() {
        let outcome = AttemptOutcome::classify(true, false, None);
        assert_eq!(outcome, AttemptOutcome::Transport);
        assert!(outcome.is_backend_failure());
    }

    #[test]
    fn status_classification() {
        assert_eq!(
            AttemptOutcome::classify(false, false, Some(StatusCode::NO_CONTENT)),
            AttemptOutcome::Success(StatusCode::NO_CONTENT)
        );
        for status in [StatusCode::MOVED_PERMANENTLY, StatusCode::NOT_FOUND, StatusCode::BAD_GATEWAY] {
            let outcome = AttemptOutcome::classify(false, false, Some(status));
            assert_eq!(outcome, AttemptOutcome::BadStatus(status));
            assert!(outcome.is_backend_failure());
        }
    }

    #[test]
    fn silent_backend_is_failure() {
        let outcome = AttemptOutcome::classify(false, false, None);
        assert_eq!(outcome, AttemptOutcome::Silent);
        assert!(outcome.is_backend_failure());
    }

    #[test]
    fn policy_bounds_attempts() {
        let policy = RetryPolicy::default();
        assert!(policy.allows(0));
        assert!(policy.allows(2));
        assert!(!policy.allows(3));

        let floor = RetryPolicy::new(0);
        assert!(floor.allows(0));
        assert!(!floor.allows(1));
    }
}
