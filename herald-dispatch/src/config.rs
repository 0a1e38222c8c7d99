//! Dispatcher configuration
//!
//! Defaults suit a freshly warmed-up sending line; raise them only once the
//! line has history.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::policy::RetryPolicy;

const fn default_daily_cap() -> u64 {
    400
}

const fn default_jitter_min_ms() -> u64 {
    6_000
}

const fn default_jitter_max_ms() -> u64 {
    10_000
}

const fn default_micro_jitter_ms() -> u64 {
    700
}

const fn default_min_spacing_ms() -> u64 {
    6_000
}

const fn default_event_buffer() -> usize {
    256
}

/// Tunables for the campaign engine and its collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum sends per client between two quota resets
    ///
    /// Default: 400
    #[serde(default = "default_daily_cap")]
    pub daily_cap: u64,

    /// Lower bound of the pre-send jitter window (milliseconds)
    ///
    /// Default: 6000
    #[serde(default = "default_jitter_min_ms")]
    pub jitter_min_ms: u64,

    /// Upper bound of the pre-send jitter window (milliseconds)
    ///
    /// Default: 10000
    #[serde(default = "default_jitter_max_ms")]
    pub jitter_max_ms: u64,

    /// Width of the symmetric micro-jitter added on top of the base delay
    ///
    /// A width of 700 adds a uniform offset in ±350ms.
    ///
    /// Default: 700
    #[serde(default = "default_micro_jitter_ms")]
    pub micro_jitter_ms: u64,

    /// Minimum gap between two consecutive send starts on the same client
    ///
    /// Default: 6000
    #[serde(default = "default_min_spacing_ms")]
    pub min_spacing_ms: u64,

    /// Retry and backoff behaviour for failed deliveries
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Capacity of each per-client progress channel
    ///
    /// Default: 256
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            daily_cap: default_daily_cap(),
            jitter_min_ms: default_jitter_min_ms(),
            jitter_max_ms: default_jitter_max_ms(),
            micro_jitter_ms: default_micro_jitter_ms(),
            min_spacing_ms: default_min_spacing_ms(),
            retry: RetryPolicy::default(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl DispatchConfig {
    #[must_use]
    pub const fn min_spacing(&self) -> Duration {
        Duration::from_millis(self.min_spacing_ms)
    }

    /// Check the configured windows are well formed
    ///
    /// # Errors
    ///
    /// Returns a description of the first inconsistent setting.
    pub fn validate(&self) -> Result<(), String> {
        if self.jitter_min_ms > self.jitter_max_ms {
            return Err(format!(
                "jitter_min_ms ({}) exceeds jitter_max_ms ({})",
                self.jitter_min_ms, self.jitter_max_ms
            ));
        }
        if self.retry.backoff_min_ms > self.retry.backoff_max_ms {
            return Err(format!(
                "retry.backoff_min_ms ({}) exceeds retry.backoff_max_ms ({})",
                self.retry.backoff_min_ms, self.retry.backoff_max_ms
            ));
        }
        if self.event_buffer == 0 {
            return Err("event_buffer must be greater than zero".to_string());
        }
        Ok(())
    }
}
