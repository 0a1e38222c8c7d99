//! Retry policy for failed deliveries.
//!
//! Unlike a queue-level retry schedule, retries here happen inline: the
//! campaign waits out the backoff and tries the same item again before
//! moving on.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Retry policy configuration for deliveries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first failed attempt.
    ///
    /// Default: 2 (three attempts in total)
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Lower bound of the backoff window (milliseconds).
    ///
    /// Default: 15000
    #[serde(default = "defaults::backoff_min_ms")]
    pub backoff_min_ms: u64,

    /// Upper bound of the backoff window (milliseconds).
    ///
    /// Default: 25000
    #[serde(default = "defaults::backoff_max_ms")]
    pub backoff_max_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: defaults::max_retries(),
            backoff_min_ms: defaults::backoff_min_ms(),
            backoff_max_ms: defaults::backoff_max_ms(),
        }
    }
}

impl RetryPolicy {
    /// Check whether another attempt is allowed.
    ///
    /// `attempts_so_far` counts failed attempts before the current one,
    /// starting at 0 for the first delivery.
    #[must_use]
    pub const fn should_retry(&self, attempts_so_far: u32) -> bool {
        attempts_so_far < self.max_retries
    }

    /// Remaining retries, saturating at zero.
    #[must_use]
    pub const fn remaining_retries(&self, attempts_so_far: u32) -> u32 {
        self.max_retries.saturating_sub(attempts_so_far)
    }

    /// Pick a backoff uniformly from the configured window.
    #[must_use]
    pub fn backoff(&self) -> Duration {
        let (low, high) = if self.backoff_min_ms <= self.backoff_max_ms {
            (self.backoff_min_ms, self.backoff_max_ms)
        } else {
            (self.backoff_max_ms, self.backoff_min_ms)
        };
        let millis = rand::rng().random_range(low..=high);
        Duration::from_millis(millis)
    }
}

mod defaults {
    pub const fn max_retries() -> u32 {
        2
    }

    pub const fn backoff_min_ms() -> u64 {
        15_000
    }

    pub const fn backoff_max_ms() -> u64 {
        25_000
    }
}
