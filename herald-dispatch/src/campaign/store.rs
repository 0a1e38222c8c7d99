//! In-memory campaign registry

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use herald_common::ClientId;
use parking_lot::RwLock;

use super::types::{
    CampaignDetail, CampaignId, CampaignStatus, CampaignSummary, Item, PauseReason, Stats,
};

/// Immutable part of a campaign, fixed at creation
#[derive(Debug, Clone)]
pub struct CampaignMeta {
    pub id: CampaignId,
    pub client_id: ClientId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub template: String,
    pub image: Option<String>,
    pub dry_run: bool,
}

#[derive(Debug)]
struct CampaignState {
    status: CampaignStatus,
    pause_reason: Option<PauseReason>,
    stats: Stats,
}

/// A campaign as held by the store
///
/// Items never change after creation. Status and stats are written by the
/// campaign's processing task; the only outside write is `cancel`.
#[derive(Debug)]
pub struct CampaignRecord {
    meta: CampaignMeta,
    items: Arc<[Item]>,
    state: RwLock<CampaignState>,
}

impl CampaignRecord {
    #[must_use]
    pub fn new(meta: CampaignMeta, items: Vec<Item>) -> Self {
        let total = u64::try_from(items.len()).unwrap_or(u64::MAX);
        Self {
            meta,
            items: Arc::from(items),
            state: RwLock::new(CampaignState {
                status: CampaignStatus::Running,
                pause_reason: None,
                stats: Stats::new(total),
            }),
        }
    }

    #[must_use]
    pub const fn meta(&self) -> &CampaignMeta {
        &self.meta
    }

    #[must_use]
    pub fn items(&self) -> Arc<[Item]> {
        Arc::clone(&self.items)
    }

    #[must_use]
    pub fn status(&self) -> CampaignStatus {
        self.state.read().status
    }

    #[must_use]
    pub fn pause_reason(&self) -> Option<PauseReason> {
        self.state.read().pause_reason
    }

    #[must_use]
    pub fn stats(&self) -> Stats {
        self.state.read().stats
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status() == CampaignStatus::Running
    }

    /// Move out of `Running`.
    ///
    /// Returns `false`, leaving the state untouched, if the campaign had
    /// already left `Running` (e.g. it was cancelled concurrently).
    pub fn finish(&self, status: CampaignStatus, pause_reason: Option<PauseReason>) -> bool {
        let mut state = self.state.write();
        if state.status != CampaignStatus::Running {
            return false;
        }
        state.status = status;
        state.pause_reason = pause_reason;
        true
    }

    /// Force the `Error` state regardless of the current status
    pub(crate) fn fail(&self) {
        let mut state = self.state.write();
        state.status = CampaignStatus::Error;
        state.pause_reason = None;
    }

    /// Apply `update` to the stats and return the new values
    pub(crate) fn record(&self, update: impl FnOnce(&mut Stats)) -> Stats {
        let mut state = self.state.write();
        update(&mut state.stats);
        state.stats
    }

    #[must_use]
    pub fn summary(&self) -> CampaignSummary {
        let state = self.state.read();
        CampaignSummary {
            campaign_id: self.meta.id,
            client_id: self.meta.client_id.clone(),
            title: self.meta.title.clone(),
            created_at: self.meta.created_at,
            status: state.status,
            pause_reason: state.pause_reason,
            stats: state.stats,
        }
    }

    #[must_use]
    pub fn detail(&self) -> CampaignDetail {
        CampaignDetail {
            summary: self.summary(),
            dry_run: self.meta.dry_run,
            items: self.items.to_vec(),
        }
    }
}

/// Concurrent map of campaigns by id
#[derive(Debug, Clone, Default)]
pub struct CampaignStore {
    campaigns: Arc<DashMap<CampaignId, Arc<CampaignRecord>>>,
}

impl CampaignStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: Arc<CampaignRecord>) {
        self.campaigns.insert(record.meta.id, record);
    }

    #[must_use]
    pub fn get(&self, id: &CampaignId) -> Option<Arc<CampaignRecord>> {
        self.campaigns.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Summaries of every campaign, oldest first
    #[must_use]
    pub fn list(&self) -> Vec<CampaignSummary> {
        let mut summaries: Vec<_> = self
            .campaigns
            .iter()
            .map(|entry| entry.value().summary())
            .collect();
        summaries.sort_by_key(|summary| (summary.created_at, summary.campaign_id));
        summaries
    }

    #[must_use]
    pub fn detail(&self, id: &CampaignId) -> Option<CampaignDetail> {
        self.get(id).map(|record| record.detail())
    }

    /// Request cancellation.
    ///
    /// Returns whether the campaign exists. Only a `Running` campaign changes
    /// state; the processing task notices at its next checkpoint.
    pub fn cancel(&self, id: &CampaignId) -> bool {
        let Some(record) = self.get(id) else {
            return false;
        };
        record.finish(CampaignStatus::Cancelled, None);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.campaigns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.campaigns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use herald_common::RecipientId;

    use super::*;
    use crate::consent::{Eligibility, SkipReason};

    fn record(items: usize) -> Arc<CampaignRecord> {
        let id = CampaignId::generate();
        let items = (0..items)
            .map(|n| Item {
                recipient: RecipientId::parse(&format!("5730000000{n}")).unwrap(),
                vars: ahash::AHashMap::new(),
                eligibility: if n % 2 == 0 {
                    Eligibility::Eligible
                } else {
                    Eligibility::Skip(SkipReason::NoOptIn)
                },
            })
            .collect();

        Arc::new(CampaignRecord::new(
            CampaignMeta {
                id,
                client_id: ClientId::from("line-1"),
                title: format!("Campaign {id}"),
                created_at: Utc::now(),
                template: "Hi".to_string(),
                image: None,
                dry_run: true,
            },
            items,
        ))
    }

    #[test]
    fn test_new_record_is_running_with_total() {
        let record = record(3);
        assert_eq!(record.status(), CampaignStatus::Running);
        assert_eq!(record.stats(), Stats::new(3));
        assert_eq!(record.items().len(), 3);
    }

    #[test]
    fn test_finish_only_from_running() {
        let record = record(1);
        assert!(record.finish(CampaignStatus::Paused, Some(PauseReason::DailyCap)));
        assert_eq!(record.pause_reason(), Some(PauseReason::DailyCap));

        assert!(!record.finish(CampaignStatus::Done, None));
        assert_eq!(record.status(), CampaignStatus::Paused);
    }

    #[test]
    fn test_cancel() {
        let store = CampaignStore::new();
        let running = record(2);
        store.insert(Arc::clone(&running));

        assert!(store.cancel(&running.meta().id));
        assert_eq!(running.status(), CampaignStatus::Cancelled);

        // Cancelling again still reports existence but changes nothing
        assert!(store.cancel(&running.meta().id));
        assert_eq!(running.status(), CampaignStatus::Cancelled);

        assert!(!store.cancel(&CampaignId::generate()));
    }

    #[test]
    fn test_cancel_does_not_override_terminal_state() {
        let store = CampaignStore::new();
        let done = record(1);
        store.insert(Arc::clone(&done));
        assert!(done.finish(CampaignStatus::Done, None));

        assert!(store.cancel(&done.meta().id));
        assert_eq!(done.status(), CampaignStatus::Done);
    }

    #[test]
    fn test_list_and_detail_snapshots() {
        let store = CampaignStore::new();
        let first = record(2);
        let second = record(4);
        store.insert(Arc::clone(&second));
        store.insert(Arc::clone(&first));

        first.record(|stats| stats.sent += 1);

        let list = store.list();
        assert_eq!(list.len(), 2);
        let first_summary = list
            .iter()
            .find(|s| s.campaign_id == first.meta().id)
            .unwrap();
        assert_eq!(first_summary.stats.sent, 1);

        let detail = store.detail(&second.meta().id).unwrap();
        assert_eq!(detail.items.len(), 4);
        assert!(detail.dry_run);
        assert_eq!(detail.summary.stats.total, 4);

        // Snapshots do not follow later updates
        second.record(|stats| stats.skipped += 1);
        assert_eq!(detail.summary.stats.skipped, 0);

        assert!(store.detail(&CampaignId::generate()).is_none());
    }
}
