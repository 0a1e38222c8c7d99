//! Per-campaign processing loop

use std::sync::Arc;

use herald_common::{campaign, tracing};

use super::{
    engine::EngineInner,
    store::CampaignRecord,
    template,
    types::{CampaignStatus, Item, PauseReason},
};
use crate::{
    consent::Eligibility,
    events::ProgressEvent,
    gate::Verdict,
    throttle::{ClientThrottle, jittered_delay},
    transport::OutboundMessage,
};

/// What the loop does after an item has been dispatched
enum Flow {
    Next,
    Halt,
}

/// Walk the campaign's items in order until they run out or the campaign
/// leaves `running`, then emit `done` or `stopped`.
pub(crate) async fn run(inner: Arc<EngineInner>, record: Arc<CampaignRecord>) {
    let meta = record.meta();
    let client = &meta.client_id;
    let throttle = inner.context.throttles.get(client);
    let items = record.items();

    campaign!("Processing campaign {} ({} items)", meta.id, items.len());

    for (index, item) in items.iter().enumerate() {
        if !record.is_running() {
            break;
        }

        if inner.quiet_hours.is_quiet() {
            pause(&inner, &record, PauseReason::QuietHours, index);
            break;
        }

        if inner.context.quota.is_exhausted(client) {
            pause(&inner, &record, PauseReason::DailyCap, index);
            break;
        }

        if let Eligibility::Skip(reason) = item.eligibility {
            record.record(|stats| stats.skipped += 1);
            inner.emit(
                meta,
                ProgressEvent::Skipped {
                    index,
                    recipient: item.recipient.clone(),
                    reason,
                },
            );
            continue;
        }

        let text = template::render(&meta.template, &item.vars);
        tokio::time::sleep(jittered_delay(&inner.config)).await;

        // A cancel that lands during the pause must not let this send through
        if !record.is_running() {
            break;
        }

        if let Flow::Halt = dispatch(&inner, &record, &throttle, index, item, text).await {
            break;
        }
    }

    let stats = record.stats();
    if record.finish(CampaignStatus::Done, None) {
        campaign!(level = INFO, "Campaign {} done", meta.id);
        inner.emit(meta, ProgressEvent::Done { stats });
    } else {
        let status = record.status();
        campaign!(level = INFO, "Campaign {} stopped ({})", meta.id, status);
        inner.emit(meta, ProgressEvent::Stopped { status, stats });
    }
}

fn pause(inner: &EngineInner, record: &CampaignRecord, reason: PauseReason, index: usize) {
    let event = match reason {
        PauseReason::DailyCap => ProgressEvent::PausedDailyCap { index },
        PauseReason::SpamSignal => ProgressEvent::PausedSpamSignal { index },
        PauseReason::QuietHours => ProgressEvent::PausedQuietHours { index },
    };

    if record.finish(CampaignStatus::Paused, Some(reason)) {
        inner.emit(record.meta(), event);
    }
}

/// Send one eligible item under the client throttle
///
/// Every attempt and every retry backoff happen while the throttle is held,
/// so other campaigns on the same client wait until this item settles. The
/// daily cap is checked again once the throttle is acquired.
async fn dispatch(
    inner: &EngineInner,
    record: &CampaignRecord,
    throttle: &ClientThrottle,
    index: usize,
    item: &Item,
    text: String,
) -> Flow {
    throttle
        .schedule(attempt(inner, record, index, item, text))
        .await
}

async fn attempt(
    inner: &EngineInner,
    record: &CampaignRecord,
    index: usize,
    item: &Item,
    text: String,
) -> Flow {
    let meta = record.meta();
    let client = &meta.client_id;
    let quota = &inner.context.quota;

    if quota.is_exhausted(client) {
        pause(inner, record, PauseReason::DailyCap, index);
        return Flow::Halt;
    }

    let message = OutboundMessage {
        recipient: item.recipient.clone(),
        text,
        image: meta.image.clone(),
    };

    let mut attempts = 0;
    loop {
        let outcome = if meta.dry_run {
            Ok(None)
        } else {
            inner.transport.deliver(client, &message).await.map(Some)
        };

        let error = match outcome {
            Ok(None) => {
                quota.increment(client, 1);
                record.record(|stats| stats.sent += 1);
                inner.emit(
                    meta,
                    ProgressEvent::DryRun {
                        index,
                        recipient: item.recipient.clone(),
                        text: message.text,
                    },
                );
                return Flow::Next;
            }
            Ok(Some(receipt)) => {
                quota.increment(client, 1);
                record.record(|stats| stats.sent += 1);
                tracing::debug!(
                    campaign_id = %meta.id,
                    client_id = %client,
                    recipient = %item.recipient,
                    delivery_id = %receipt.delivery_id,
                    "Message delivered"
                );
                inner.emit(
                    meta,
                    ProgressEvent::Sent {
                        index,
                        recipient: item.recipient.clone(),
                        delivery_id: receipt.delivery_id,
                        kind: receipt.kind,
                    },
                );
                return Flow::Next;
            }
            Err(error) => error,
        };

        let assessment = inner.gate.assess(&error, attempts);
        tracing::warn!(
            campaign_id = %meta.id,
            client_id = %client,
            recipient = %item.recipient,
            kind = %assessment.kind,
            attempt = attempts + 1,
            retries_left = inner.gate.retry_policy().remaining_retries(attempts),
            session = error.is_session(),
            %error,
            "Delivery failed"
        );

        match assessment.verdict {
            Verdict::Retry { backoff } => {
                attempts += 1;
                record.record(|stats| stats.retried += 1);
                inner.emit(
                    meta,
                    ProgressEvent::Retry {
                        index,
                        recipient: item.recipient.clone(),
                        attempt: attempts,
                        kind: assessment.kind,
                    },
                );
                tokio::time::sleep(backoff).await;
            }
            Verdict::Fail => {
                record.record(|stats| stats.failed += 1);
                inner.emit(
                    meta,
                    ProgressEvent::Failed {
                        index,
                        recipient: item.recipient.clone(),
                        error: error.to_string(),
                    },
                );
                return Flow::Next;
            }
            Verdict::Halt => {
                inner.context.consent.blacklist(&item.recipient);
                record.record(|stats| stats.failed += 1);
                inner.emit(
                    meta,
                    ProgressEvent::FailedSpammy {
                        index,
                        recipient: item.recipient.clone(),
                        error: error.to_string(),
                    },
                );
                pause(inner, record, PauseReason::SpamSignal, index);
                return Flow::Halt;
            }
        }
    }
}
