//! Campaign data model

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use herald_common::{ClientId, RecipientId};
use serde::{Deserialize, Serialize};

use crate::consent::Eligibility;

/// Identifier for a campaign
///
/// A ULID, so ids sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CampaignId {
    id: ulid::Ulid,
}

impl CampaignId {
    #[must_use]
    pub fn generate() -> Self {
        Self {
            id: ulid::Ulid::new(),
        }
    }

    /// Parse an id previously produced by `Display`
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        ulid::Ulid::from_string(s).ok().map(|id| Self { id })
    }
}

impl std::fmt::Display for CampaignId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl serde::Serialize for CampaignId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.id.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for CampaignId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let id = ulid::Ulid::from_string(&s).map_err(serde::de::Error::custom)?;
        Ok(Self { id })
    }
}

/// Campaign lifecycle state
///
/// `Running` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Running,
    Paused,
    Done,
    Cancelled,
    Error,
}

impl CampaignStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        })
    }
}

/// Why a campaign stopped in `Paused`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    DailyCap,
    SpamSignal,
    QuietHours,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total: u64,
    pub sent: u64,
    pub skipped: u64,
    pub failed: u64,
    pub retried: u64,
}

impl Stats {
    #[must_use]
    pub const fn new(total: u64) -> Self {
        Self {
            total,
            sent: 0,
            skipped: 0,
            failed: 0,
            retried: 0,
        }
    }

    /// Items with a final outcome (sent, skipped or failed)
    #[must_use]
    pub const fn settled(&self) -> u64 {
        self.sent + self.skipped + self.failed
    }
}

/// One recipient of a campaign, classified at creation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub recipient: RecipientId,
    #[serde(default, skip_serializing_if = "no_vars")]
    pub vars: AHashMap<String, String>,
    pub eligibility: Eligibility,
}

fn no_vars(vars: &AHashMap<String, String>) -> bool {
    vars.is_empty()
}

/// A recipient as submitted by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientEntry {
    /// Raw address; normalized to digits only
    pub recipient: String,
    #[serde(default)]
    pub vars: AHashMap<String, String>,
}

impl RecipientEntry {
    pub fn new(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            vars: AHashMap::new(),
        }
    }

    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

/// Input to [`crate::CampaignEngine::start_campaign`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignRequest {
    pub client_id: ClientId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub recipients: Vec<RecipientEntry>,
    /// Required; an empty template is allowed and renders to empty text
    #[serde(default)]
    pub message_template: Option<String>,
    /// Image URL or base64 data URI, validated per item at delivery time
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

/// Returned as soon as a campaign is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignTicket {
    pub campaign_id: CampaignId,
    pub total: u64,
    pub eligible: u64,
}

/// Campaign metadata and progress, without items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub campaign_id: CampaignId,
    pub client_id: ClientId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub status: CampaignStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_reason: Option<PauseReason>,
    pub stats: Stats,
}

/// Full campaign snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignDetail {
    #[serde(flatten)]
    pub summary: CampaignSummary,
    pub dry_run: bool,
    pub items: Vec<Item>,
}
