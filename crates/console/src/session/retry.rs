//! Retry policy of the identity probe.

use std::time::Duration;

use crate::api::ErrorClass;

/// Outcome of a [`RetryPolicy`] decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after the delay.
    Retry(Duration),
    /// Give up.
    Stop,
}

/// Bounded exponential backoff that never retries rejected credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound of any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Default backoff with `max_attempts` total attempts (at least one).
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Delay after failed attempt number `attempt` (1-based):
    /// `base_delay * 2^(attempt - 1)`, capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Decide what follows a failure of `class` after `attempts_made` attempts.
    #[must_use]
    pub fn decide(&self, class: ErrorClass, attempts_made: u32) -> RetryDecision {
        if class == ErrorClass::Auth || attempts_made >= self.max_attempts {
            return RetryDecision::Stop;
        }
        RetryDecision::Retry(self.delay_for(attempts_made))
    }
}
