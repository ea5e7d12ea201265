//! Retry policy and per-attempt outcomes for text generation.

use std::time::Duration;

use crate::error::GenerationError;

/// Exponential backoff: `base_delay`, then doubling, for `max_retries`
/// additional attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Initial attempt plus retries.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// What a single attempt produced.
#[derive(Debug)]
pub(crate) enum AttemptOutcome {
    Success(String),
    /// Transient failure; another attempt may succeed.
    Retry(GenerationError),
    /// Stop retrying and fall back immediately.
    Abort(GenerationError),
}

impl AttemptOutcome {
    pub(crate) fn from_error(error: GenerationError) -> Self {
        if error.is_retriable() {
            Self::Retry(error)
        } else {
            Self::Abort(error)
        }
    }
}
