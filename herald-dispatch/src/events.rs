//! Campaign progress events and sinks

use dashmap::DashMap;
use herald_common::{ClientId, RecipientId, tracing};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{
    campaign::types::{CampaignId, CampaignStatus, Stats},
    consent::SkipReason,
    gate::FailureKind,
    transport::DeliveryKind,
};

/// A single step of campaign progress
///
/// `index` is the zero-based position of the item in the campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Started {
        title: String,
        stats: Stats,
    },
    Skipped {
        index: usize,
        recipient: RecipientId,
        reason: SkipReason,
    },
    Sent {
        index: usize,
        recipient: RecipientId,
        delivery_id: String,
        kind: DeliveryKind,
    },
    DryRun {
        index: usize,
        recipient: RecipientId,
        text: String,
    },
    Retry {
        index: usize,
        recipient: RecipientId,
        /// One-based number of the retry about to be made
        attempt: u32,
        kind: FailureKind,
    },
    Failed {
        index: usize,
        recipient: RecipientId,
        error: String,
    },
    FailedSpammy {
        index: usize,
        recipient: RecipientId,
        error: String,
    },
    PausedDailyCap {
        index: usize,
    },
    PausedSpamSignal {
        index: usize,
    },
    PausedQuietHours {
        index: usize,
    },
    Done {
        stats: Stats,
    },
    Stopped {
        status: CampaignStatus,
        stats: Stats,
    },
    Error {
        error: String,
    },
}

impl ProgressEvent {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Skipped { .. } => "skipped",
            Self::Sent { .. } => "sent",
            Self::DryRun { .. } => "dry_run",
            Self::Retry { .. } => "retry",
            Self::Failed { .. } => "failed",
            Self::FailedSpammy { .. } => "failed_spammy",
            Self::PausedDailyCap { .. } => "paused_daily_cap",
            Self::PausedSpamSignal { .. } => "paused_spam_signal",
            Self::PausedQuietHours { .. } => "paused_quiet_hours",
            Self::Done { .. } => "done",
            Self::Stopped { .. } => "stopped",
            Self::Error { .. } => "error",
        }
    }

    /// Returns `true` for the last event a campaign emits
    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(
            self,
            Self::Done { .. } | Self::Stopped { .. } | Self::Error { .. }
        )
    }
}

/// An event addressed to a campaign of a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignUpdate {
    pub client_id: ClientId,
    pub campaign_id: CampaignId,
    pub event: ProgressEvent,
}

/// Receives every progress event the engine produces.
///
/// `emit` is called from the campaign's processing task and must not block.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, client: &ClientId, campaign: &CampaignId, event: ProgressEvent);
}

/// Fans events out to per-client broadcast channels
///
/// Events for a client with no subscribers are dropped. Slow subscribers
/// lag and lose the oldest events rather than holding up the campaign.
#[derive(Debug)]
pub struct BroadcastSink {
    capacity: usize,
    channels: DashMap<ClientId, broadcast::Sender<CampaignUpdate>>,
}

impl BroadcastSink {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: DashMap::new(),
        }
    }

    fn sender(&self, client: &ClientId) -> broadcast::Sender<CampaignUpdate> {
        self.channels
            .entry(client.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Subscribe to every event of `client`'s campaigns from now on
    #[must_use]
    pub fn subscribe(&self, client: &ClientId) -> broadcast::Receiver<CampaignUpdate> {
        self.sender(client).subscribe()
    }
}

impl ProgressSink for BroadcastSink {
    fn emit(&self, client: &ClientId, campaign: &CampaignId, event: ProgressEvent) {
        let update = CampaignUpdate {
            client_id: client.clone(),
            campaign_id: *campaign,
            event,
        };

        if self.sender(client).send(update).is_err() {
            tracing::trace!(client_id = %client, campaign_id = %campaign, "No progress subscribers");
        }
    }
}

/// Logs every event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&self, client: &ClientId, campaign: &CampaignId, event: ProgressEvent) {
        match &event {
            ProgressEvent::Error { error } => {
                tracing::error!(client_id = %client, campaign_id = %campaign, %error, "Campaign failed");
            }
            ProgressEvent::FailedSpammy { recipient, error, .. } => {
                tracing::warn!(
                    client_id = %client,
                    campaign_id = %campaign,
                    %recipient,
                    %error,
                    "Spam signal, campaign paused"
                );
            }
            ProgressEvent::PausedDailyCap { .. } | ProgressEvent::PausedQuietHours { .. } => {
                tracing::info!(client_id = %client, campaign_id = %campaign, event = event.name(), "Campaign paused");
            }
            ProgressEvent::Done { stats } | ProgressEvent::Stopped { stats, .. } => {
                tracing::info!(
                    client_id = %client,
                    campaign_id = %campaign,
                    event = event.name(),
                    total = stats.total,
                    sent = stats.sent,
                    skipped = stats.skipped,
                    failed = stats.failed,
                    retried = stats.retried,
                    "Campaign finished"
                );
            }
            _ => {
                tracing::debug!(client_id = %client, campaign_id = %campaign, ?event, "Campaign progress");
            }
        }
    }
}
