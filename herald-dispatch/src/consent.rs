//! Recipient consent tracking
//!
//! Three sets of canonical recipient ids: opted in, opted out, and
//! blacklisted. Raw inputs are normalized before they touch a set, so
//! formatting differences never cause a false negative.
//!
//! Blacklist entries are only ever added by the delivery gate's spam policy
//! and survive for the lifetime of the registry.

use ahash::AHashSet;
use herald_common::RecipientId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Why an item was classified as not eligible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoOptIn,
    OptedOut,
    Blacklisted,
}

impl SkipReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoOptIn => "no_opt_in",
            Self::OptedOut => "opted_out",
            Self::Blacklisted => "blacklisted",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a consent check for one recipient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum Eligibility {
    Eligible,
    Skip(SkipReason),
}

impl Eligibility {
    #[must_use]
    pub const fn is_eligible(self) -> bool {
        matches!(self, Self::Eligible)
    }
}

/// Consent lists snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentLists {
    pub opt_in: Vec<RecipientId>,
    pub opt_out: Vec<RecipientId>,
}

#[derive(Debug, Default)]
pub struct ConsentRegistry {
    opt_in: RwLock<AHashSet<RecipientId>>,
    opt_out: RwLock<AHashSet<RecipientId>>,
    blacklist: RwLock<AHashSet<RecipientId>>,
}

fn insert_all<I, S>(set: &RwLock<AHashSet<RecipientId>>, ids: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let parsed: Vec<_> = ids
        .into_iter()
        .filter_map(|raw| RecipientId::parse(raw.as_ref()))
        .collect();
    set.write().extend(parsed);
}

fn remove_all<I, S>(set: &RwLock<AHashSet<RecipientId>>, ids: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let parsed: Vec<_> = ids
        .into_iter()
        .filter_map(|raw| RecipientId::parse(raw.as_ref()))
        .collect();
    let mut set = set.write();
    for id in &parsed {
        set.remove(id);
    }
}

fn sorted(set: &RwLock<AHashSet<RecipientId>>) -> Vec<RecipientId> {
    let mut ids: Vec<_> = set.read().iter().cloned().collect();
    ids.sort_unstable();
    ids
}

impl ConsentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_opt_in<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        insert_all(&self.opt_in, ids);
    }

    pub fn add_opt_out<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        insert_all(&self.opt_out, ids);
    }

    pub fn remove_opt_in<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        remove_all(&self.opt_in, ids);
    }

    pub fn remove_opt_out<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        remove_all(&self.opt_out, ids);
    }

    #[must_use]
    pub fn list_opt_in(&self) -> Vec<RecipientId> {
        sorted(&self.opt_in)
    }

    #[must_use]
    pub fn list_opt_out(&self) -> Vec<RecipientId> {
        sorted(&self.opt_out)
    }

    #[must_use]
    pub fn lists(&self) -> ConsentLists {
        ConsentLists {
            opt_in: self.list_opt_in(),
            opt_out: self.list_opt_out(),
        }
    }

    /// Permanently exclude a recipient from future campaigns
    pub fn blacklist(&self, id: &RecipientId) {
        self.blacklist.write().insert(id.clone());
    }

    #[must_use]
    pub fn is_blacklisted(&self, id: &RecipientId) -> bool {
        self.blacklist.read().contains(id)
    }

    #[must_use]
    pub fn list_blacklist(&self) -> Vec<RecipientId> {
        sorted(&self.blacklist)
    }

    /// Classify a recipient for a new campaign.
    ///
    /// Opt-out and blacklist dominate opt-in: a recipient present in both
    /// the opt-in and opt-out sets is skipped as `opted_out`.
    #[must_use]
    pub fn eligibility(&self, id: &RecipientId) -> Eligibility {
        if self.opt_out.read().contains(id) {
            return Eligibility::Skip(SkipReason::OptedOut);
        }
        if self.is_blacklisted(id) {
            return Eligibility::Skip(SkipReason::Blacklisted);
        }
        if !self.opt_in.read().contains(id) {
            return Eligibility::Skip(SkipReason::NoOptIn);
        }
        Eligibility::Eligible
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn id(raw: &str) -> RecipientId {
        RecipientId::parse(raw).unwrap()
    }

    #[test]
    fn test_add_normalizes_and_is_idempotent() {
        let registry = ConsentRegistry::new();
        registry.add_opt_in(["+57 300 000 0001", "573000000001", "57-300-000-0002"]);
        registry.add_opt_in(["573000000001"]);

        assert_eq!(
            registry.list_opt_in(),
            vec![id("573000000001"), id("573000000002")]
        );
    }

    #[test]
    fn test_empty_identifiers_are_ignored() {
        let registry = ConsentRegistry::new();
        registry.add_opt_out(["", "n/a", "---"]);
        assert!(registry.list_opt_out().is_empty());
    }

    #[test]
    fn test_remove() {
        let registry = ConsentRegistry::new();
        registry.add_opt_in(["111", "222"]);
        registry.add_opt_out(["333"]);

        registry.remove_opt_in(["(111)"]);
        registry.remove_opt_out(["333", "999"]);

        assert_eq!(registry.list_opt_in(), vec![id("222")]);
        assert!(registry.list_opt_out().is_empty());
    }

    #[test]
    fn test_opt_out_dominates_opt_in() {
        let registry = ConsentRegistry::new();
        registry.add_opt_in(["111"]);
        registry.add_opt_out(["111"]);

        assert_eq!(
            registry.eligibility(&id("111")),
            Eligibility::Skip(SkipReason::OptedOut)
        );
    }

    #[test]
    fn test_missing_opt_in() {
        let registry = ConsentRegistry::new();
        assert_eq!(
            registry.eligibility(&id("222")),
            Eligibility::Skip(SkipReason::NoOptIn)
        );
    }

    #[test]
    fn test_blacklist_dominates_opt_in() {
        let registry = ConsentRegistry::new();
        registry.add_opt_in(["333"]);
        assert!(registry.eligibility(&id("333")).is_eligible());

        registry.blacklist(&id("333"));
        assert!(registry.is_blacklisted(&id("333")));
        assert_eq!(
            registry.eligibility(&id("333")),
            Eligibility::Skip(SkipReason::Blacklisted)
        );
        assert_eq!(registry.list_blacklist(), vec![id("333")]);
    }

    #[test]
    fn test_lists_snapshot() {
        let registry = ConsentRegistry::new();
        registry.add_opt_in(["2", "1"]);
        registry.add_opt_out(["3"]);

        let lists = registry.lists();
        assert_eq!(lists.opt_in, vec![id("1"), id("2")]);
        assert_eq!(lists.opt_out, vec![id("3")]);
    }
}
