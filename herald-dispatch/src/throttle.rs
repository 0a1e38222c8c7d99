//! Per-client send serialization
//!
//! Every client gets one [`ClientThrottle`], created on first use and kept
//! for the lifetime of the registry. A throttle runs one task at a time,
//! in submission order, and keeps consecutive task starts at least
//! `min_spacing` apart. Campaigns sharing a client share its throttle, so two
//! campaigns can never raise the destination-visible send rate.
//!
//! The engine submits one item per task, retries and their backoff included,
//! and sleeps a [`jittered_delay`] before submitting it; the throttle itself
//! adds no randomness.

use std::{future::Future, sync::Arc, time::Duration};

use dashmap::DashMap;
use herald_common::ClientId;
use rand::Rng;
use tokio::{sync::Mutex, time::Instant};

use crate::config::DispatchConfig;

/// Serializes send tasks for a single client
#[derive(Debug)]
pub struct ClientThrottle {
    min_spacing: Duration,
    /// Start time of the most recent task. Tokio's mutex queues waiters
    /// fairly, which is what gives FIFO ordering.
    last_start: Mutex<Option<Instant>>,
}

impl ClientThrottle {
    #[must_use]
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            last_start: Mutex::new(None),
        }
    }

    /// Run `task` once every earlier task for this client has finished and
    /// the spacing since the previous start has elapsed.
    pub async fn schedule<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        let mut last_start = self.last_start.lock().await;

        if let Some(previous) = *last_start {
            tokio::time::sleep_until(previous + self.min_spacing).await;
        }

        *last_start = Some(Instant::now());
        task.await
    }
}

/// Lazily populated map of client throttles
#[derive(Debug)]
pub struct ThrottleRegistry {
    min_spacing: Duration,
    throttles: DashMap<ClientId, Arc<ClientThrottle>>,
}

impl ThrottleRegistry {
    #[must_use]
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            throttles: DashMap::new(),
        }
    }

    /// Get or create the throttle for `client`
    #[must_use]
    pub fn get(&self, client: &ClientId) -> Arc<ClientThrottle> {
        self.throttles
            .entry(client.clone())
            .or_insert_with(|| Arc::new(ClientThrottle::new(self.min_spacing)))
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.throttles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.throttles.is_empty()
    }
}

/// Human-like pause before a send.
///
/// Uniform in `[jitter_min_ms, jitter_max_ms]`, plus a symmetric offset in
/// `±micro_jitter_ms / 2`, clamped at zero.
#[must_use]
pub fn jittered_delay(config: &DispatchConfig) -> Duration {
    let mut rng = rand::rng();

    let (low, high) = if config.jitter_min_ms <= config.jitter_max_ms {
        (config.jitter_min_ms, config.jitter_max_ms)
    } else {
        (config.jitter_max_ms, config.jitter_min_ms)
    };

    #[allow(clippy::cast_precision_loss)]
    let base = rng.random_range(low as f64..=high as f64);

    #[allow(clippy::cast_precision_loss)]
    let half_micro = config.micro_jitter_ms as f64 / 2.0;
    let micro = if half_micro > 0.0 {
        rng.random_range(-half_micro..=half_micro)
    } else {
        0.0
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let millis = (base + micro).round().max(0.0) as u64;
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_jitter_within_bounds() {
        let config = DispatchConfig::default();
        for _ in 0..500 {
            let delay = jittered_delay(&config);
            assert!(delay >= Duration::from_millis(6_000 - 350), "{delay:?}");
            assert!(delay <= Duration::from_millis(10_000 + 350), "{delay:?}");
        }
    }

    #[test]
    fn test_jitter_clamps_at_zero() {
        let config = DispatchConfig {
            jitter_min_ms: 0,
            jitter_max_ms: 0,
            micro_jitter_ms: 0,
            ..DispatchConfig::default()
        };
        assert_eq!(jittered_delay(&config), Duration::ZERO);
    }

    #[test]
    fn test_registry_reuses_throttles() {
        let registry = ThrottleRegistry::new(Duration::from_secs(1));
        let a = registry.get(&ClientId::from("a"));
        let again = registry.get(&ClientId::from("a"));
        let b = registry.get(&ClientId::from("b"));

        assert!(Arc::ptr_eq(&a, &again));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_enforces_spacing() {
        let throttle = ClientThrottle::new(Duration::from_secs(6));
        let origin = Instant::now();

        let first = throttle.schedule(async { Instant::now() }).await;
        let second = throttle.schedule(async { Instant::now() }).await;

        assert_eq!(first - origin, Duration::ZERO);
        assert!(second - first >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_is_exclusive_and_fifo() {
        let throttle = Arc::new(ClientThrottle::new(Duration::from_millis(10)));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for n in 0..5 {
            let throttle = Arc::clone(&throttle);
            let in_flight = Arc::clone(&in_flight);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                throttle
                    .schedule(async {
                        assert_eq!(in_flight.fetch_add(1, Ordering::SeqCst), 0);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        order.lock().push(n);
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await;
            }));
            // Let each task reach the lock before the next is spawned
            tokio::task::yield_now().await;
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    }
}
