//! Bounded fixed-delay retry policy for confirmation polling.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Poll up to `max_attempts` times, sleeping `delay` between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of polls.
    pub max_attempts: u32,
    /// Sleep between polls, in milliseconds.
    pub delay_ms: u64,
}

impl RetryPolicy {
    /// Close-to-flat default: 8 polls, 1.5 s apart.
    pub const CLOSE_DEFAULT: Self = Self {
        max_attempts: 8,
        delay_ms: 1_500,
    };

    /// Open-confirmation default: 5 polls, 1 s apart.
    pub const OPEN_DEFAULT: Self = Self {
        max_attempts: 5,
        delay_ms: 1_000,
    };

    /// Create a policy.
    #[must_use]
    pub const fn new(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            delay_ms,
        }
    }

    /// Delay between polls.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Upper bound on time spent sleeping.
    #[must_use]
    pub const fn max_wait(&self) -> Duration {
        Duration::from_millis(self.delay_ms.saturating_mul(self.max_attempts as u64))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::CLOSE_DEFAULT
    }
}
