//! Per-client daily send quota
//!
//! Counts sends per client since the last reset against a single configured
//! cap. The tracker never resets itself: an external scheduler calls
//! [`QuotaTracker::reset_all`] once per period.

use ahash::AHashMap;
use herald_common::{ClientId, tracing};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub struct QuotaTracker {
    limit: u64,
    counters: RwLock<AHashMap<ClientId, u64>>,
}

impl QuotaTracker {
    #[must_use]
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            counters: RwLock::new(AHashMap::default()),
        }
    }

    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Sends recorded for `client` since the last reset
    #[must_use]
    pub fn used(&self, client: &ClientId) -> u64 {
        self.counters.read().get(client).copied().unwrap_or(0)
    }

    pub fn increment(&self, client: &ClientId, n: u64) {
        let mut counters = self.counters.write();
        let used = counters.entry(client.clone()).or_insert(0);
        *used = used.saturating_add(n);
    }

    /// Returns `true` once `client` has reached the cap
    #[must_use]
    pub fn is_exhausted(&self, client: &ClientId) -> bool {
        self.used(client) >= self.limit
    }

    /// Clear every client's counter.
    ///
    /// All counters are dropped under one write lock, so a concurrent check
    /// sees either the full pre-reset state or the full post-reset state.
    pub fn reset_all(&self) {
        let mut counters = self.counters.write();
        let clients = counters.len();
        counters.clear();
        drop(counters);
        tracing::info!(clients, "Daily quota counters reset");
    }

    #[must_use]
    pub fn stats(&self, client: &ClientId) -> QuotaStats {
        let used = self.used(client);
        let limit = self.limit;

        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let percentage = if limit > 0 {
            ((used as f64 / limit as f64) * 100.0).round() as u64
        } else {
            0
        };

        QuotaStats {
            client_id: client.clone(),
            used,
            limit,
            remaining: limit.saturating_sub(used),
            percentage,
        }
    }
}

/// Quota usage for one client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStats {
    pub client_id: ClientId,
    pub used: u64,
    pub limit: u64,
    pub remaining: u64,
    pub percentage: u64,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_increment_and_used() {
        let quota = QuotaTracker::new(10);
        let client = ClientId::from("line-1");

        assert_eq!(quota.used(&client), 0);
        quota.increment(&client, 1);
        quota.increment(&client, 3);
        assert_eq!(quota.used(&client), 4);
        assert_eq!(quota.used(&ClientId::from("line-2")), 0);
    }

    #[test]
    fn test_exhausted_at_cap() {
        let quota = QuotaTracker::new(2);
        let client = ClientId::from("line-1");

        quota.increment(&client, 1);
        assert!(!quota.is_exhausted(&client));
        quota.increment(&client, 1);
        assert!(quota.is_exhausted(&client));
    }

    #[test]
    fn test_reset_all_clears_every_client() {
        let quota = QuotaTracker::new(400);
        let clients: Vec<_> = ["a", "b", "c"].into_iter().map(ClientId::from).collect();
        for (n, client) in clients.iter().enumerate() {
            quota.increment(client, n as u64 + 5);
        }

        quota.reset_all();

        for client in &clients {
            assert_eq!(quota.used(client), 0);
        }
    }

    #[test]
    fn test_stats() {
        let quota = QuotaTracker::new(400);
        let client = ClientId::from("line-1");
        quota.increment(&client, 101);

        assert_eq!(
            quota.stats(&client),
            QuotaStats {
                client_id: client.clone(),
                used: 101,
                limit: 400,
                remaining: 299,
                percentage: 25,
            }
        );
    }

    #[test]
    fn test_stats_over_limit_and_zero_limit() {
        let quota = QuotaTracker::new(2);
        let client = ClientId::from("line-1");
        quota.increment(&client, 3);
        let stats = quota.stats(&client);
        assert_eq!(stats.remaining, 0);
        assert_eq!(stats.percentage, 150);

        let quota = QuotaTracker::new(0);
        let stats = quota.stats(&client);
        assert_eq!(stats.percentage, 0);
        assert_eq!(stats.remaining, 0);
        assert!(quota.is_exhausted(&client));
    }
}
