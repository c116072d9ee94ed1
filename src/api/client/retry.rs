//! Retry policy for conversation API requests.

use crate::error::ApiError;
use std::time::Duration;

/// Bounded retry policy used by `ApiClient`.
#[derive(Clone, Copy, Debug)]
pub(super) struct RetryPolicy {
    /// Upper bound on total attempts, including the initial request.
    pub(super) max_attempts: u32,
    /// Base delay used for exponential backoff.
    pub(super) initial_backoff: Duration,
    /// Maximum allowed delay between retry attempts.
    pub(super) max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Decide whether another attempt should be scheduled.
    pub(super) fn should_retry(&self, err: &ApiError, attempt: u32) -> bool {
        if attempt.saturating_add(1) >= self.max_attempts {
            return false;
        }
        match err {
            ApiError::Http(inner) => inner.is_timeout() || inner.is_connect(),
            ApiError::Status { code, .. } => *code == 429 || (500..=599).contains(code),
            ApiError::InvalidResponse(_) => false,
        }
    }

    /// Compute retry delay, respecting `Retry-After` when present.
    pub(super) fn retry_delay_for(&self, attempt: u32, err: &ApiError) -> Duration {
        if let Some(seconds) = err.retry_after_secs() {
            return Duration::from_secs(seconds.clamp(1, 300));
        }
        let pow = 2u32.saturating_pow(attempt);
        let millis = self
            .initial_backoff
            .as_millis()
            .saturating_mul(pow as u128)
            .min(self.max_backoff.as_millis());
        Duration::from_millis(millis as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_rate_limits_and_server_errors_only() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(&ApiError::status(429, String::new(), None), 0));
        assert!(policy.should_retry(&ApiError::status(503, String::new(), None), 1));
        assert!(!policy.should_retry(&ApiError::status(400, String::new(), None), 0));
        assert!(!policy.should_retry(&ApiError::InvalidResponse("x".into()), 0));
    }

    #[test]
    fn stops_at_attempt_cap() {
        let policy = RetryPolicy::default();
        let err = ApiError::status(500, String::new(), None);
        assert!(!policy.should_retry(&err, 2));
    }

    #[test]
    fn backoff_doubles_and_is_capped() {
        let policy = RetryPolicy::default();
        let err = ApiError::status(500, String::new(), None);
        assert_eq!(policy.retry_delay_for(0, &err), Duration::from_millis(250));
        assert_eq!(policy.retry_delay_for(2, &err), Duration::from_millis(1000));
        assert_eq!(policy.retry_delay_for(10, &err), Duration::from_secs(8));
    }

    #[test]
    fn retry_after_hint_wins_and_is_clamped() {
        let policy = RetryPolicy::default();
        let err = ApiError::status(429, String::new(), Some(0));
        assert_eq!(policy.retry_delay_for(0, &err), Duration::from_secs(1));
        let err = ApiError::status(429, String::new(), Some(900));
        assert_eq!(policy.retry_delay_for(0, &err), Duration::from_secs(300));
    }
}
