//! Retry policy as an explicit state machine.
//!
//! The caller owns the attempt counter; the policy only answers "given this
//! failure on attempt N, wait how long, or stop". Keeping the decision pure
//! makes the attempt ceiling and backoff curve testable without a backend.

use crate::Error;
use std::time::Duration;

/// Which upstream HTTP statuses are worth another attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusRetry {
    /// Any non-success status is terminal.
    Never,
    /// Only the listed statuses are retried.
    Listed(Vec<u16>),
    /// Every failure is retried uniformly until the attempt ceiling.
    Always,
}

impl StatusRetry {
    fn allows(&self, status: u16) -> bool {
        match self {
            StatusRetry::Never => false,
            StatusRetry::Listed(statuses) => statuses.contains(&status),
            StatusRetry::Always => true,
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Retry { delay: Duration },
    Fail,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Hard ceiling on attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
    pub retry_on_status: StatusRetry,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
            multiplier: 2,
            retry_on_status: StatusRetry::Never,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retry every failure kind alike, upstream statuses included.
    pub fn uniform() -> Self {
        Self::default().with_retry_on_status(StatusRetry::Always)
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_delays(mut self, base: Duration, max: Duration) -> Self {
        self.base_delay = base;
        self.max_delay = max.max(base);
        self
    }

    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier.max(1);
        self
    }

    pub fn with_retry_on_status(mut self, retry: StatusRetry) -> Self {
        self.retry_on_status = retry;
        self
    }

    /// Delay after the `attempt`-th failure (1-based): `base * multiplier^(attempt-1)`, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.multiplier.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    pub fn is_retryable(&self, err: &Error) -> bool {
        match err {
            Error::BackendRejected { status, .. } => self.retry_on_status.allows(*status),
            Error::BackendTimeout { .. } | Error::BackendTransport { .. } => true,
            _ => false,
        }
    }

    /// Decide after the `attempt`-th attempt (1-based) failed with `err`.
    pub fn decide(&self, err: &Error, attempt: u32) -> Decision {
        if attempt >= self.max_attempts || !self.is_retryable(err) {
            return Decision::Fail;
        }
        Decision::Retry {
            delay: self.delay_for(attempt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeout() -> Error {
        Error::BackendTimeout {
            endpoint: "/api/generate".into(),
            attempts: 1,
        }
    }

    fn rejected(status: u16) -> Error {
        Error::BackendRejected {
            status,
            message: "boom".into(),
        }
    }

    #[test]
    fn test_default_backoff_curve() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay_for(1), Duration::from_secs(4));
        assert_eq!(p.delay_for(2), Duration::from_secs(8));
        assert_eq!(p.delay_for(3), Duration::from_secs(10));
        assert_eq!(p.delay_for(40), Duration::from_secs(10));
    }

    #[test]
    fn test_delays_non_decreasing_and_capped() {
        let p = RetryPolicy::new()
            .with_delays(Duration::from_millis(300), Duration::from_secs(5))
            .with_multiplier(3);
        let mut prev = Duration::ZERO;
        for attempt in 1..64 {
            let d = p.delay_for(attempt);
            assert!(d >= prev);
            assert!(d <= Duration::from_secs(5));
            prev = d;
        }
    }

    #[test]
    fn test_attempt_ceiling_is_hard() {
        let p = RetryPolicy::uniform();
        assert!(matches!(p.decide(&timeout(), 1), Decision::Retry { .. }));
        assert!(matches!(p.decide(&timeout(), 2), Decision::Retry { .. }));
        assert_eq!(p.decide(&timeout(), 3), Decision::Fail);
        assert_eq!(p.decide(&rejected(503), 3), Decision::Fail);
    }

    #[test]
    fn test_status_is_terminal_by_default() {
        let p = RetryPolicy::default();
        assert_eq!(p.decide(&rejected(500), 1), Decision::Fail);
        assert!(matches!(
            p.decide(&Error::transport("reset"), 1),
            Decision::Retry { .. }
        ));
    }

    #[test]
    fn test_listed_statuses() {
        let p = RetryPolicy::new().with_retry_on_status(StatusRetry::Listed(vec![429, 503]));
        assert!(p.is_retryable(&rejected(503)));
        assert!(!p.is_retryable(&rejected(400)));
    }

    #[test]
    fn test_non_backend_errors_never_retry() {
        let p = RetryPolicy::uniform();
        let err = Error::validation_with_context("bad", crate::ErrorContext::new());
        assert_eq!(p.decide(&err, 1), Decision::Fail);
    }

    #[test]
    fn test_single_attempt_policy() {
        let p = RetryPolicy::new().with_max_attempts(0);
        assert_eq!(p.max_attempts, 1);
        assert_eq!(p.decide(&timeout(), 1), Decision::Fail);
    }
}
