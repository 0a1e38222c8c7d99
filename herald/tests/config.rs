//! The shipped example configuration must stay loadable

use std::{sync::Arc, time::Duration};

use herald::Herald;
use herald_common::ClientId;
use herald_dispatch::{BroadcastSink, CampaignStatus, ProgressEvent, SkipReason};
use pretty_assertions::assert_eq;

const EXAMPLE: &str = include_str!("../../herald.config.ron");

#[test]
fn test_example_config_parses_and_validates() {
    let herald: Herald = ron::from_str(EXAMPLE).unwrap();

    assert!(herald.validate().is_ok());
    assert_eq!(herald.dispatch.daily_cap, 400);
    assert_eq!(herald.dispatch.retry.max_retries, 2);
    assert_eq!(herald.log_level.as_deref(), Some("info"));
    assert_eq!(herald.sessions_ready, [ClientId::from("line-1")]);
    assert_eq!(herald.campaigns.len(), 1);
    assert_eq!(herald.campaigns[0].recipients.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_example_campaign_runs_on_loopback() {
    let mut herald: Herald = ron::from_str(EXAMPLE).unwrap();
    herald.campaigns[0].dry_run = false;

    let client = ClientId::from("line-1");
    let sink = Arc::new(BroadcastSink::new(64));
    let engine = herald.engine(sink.clone());
    let mut rx = sink.subscribe(&client);

    let request = herald.campaigns.remove(0);
    let ticket = engine.start_campaign(request).unwrap();
    assert_eq!(ticket.total, 4);
    assert_eq!(ticket.eligible, 2);

    let mut events = Vec::new();
    let collect = async {
        loop {
            let update = rx.recv().await.unwrap();
            let last = update.event.is_final();
            events.push(update.event);
            if last {
                break;
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(3600), collect)
        .await
        .unwrap();

    let names: Vec<_> = events.iter().map(ProgressEvent::name).collect();
    assert_eq!(names, ["started", "sent", "sent", "skipped", "skipped", "done"]);
    assert!(matches!(
        &events[3],
        ProgressEvent::Skipped { reason: SkipReason::OptedOut, .. }
    ));
    assert!(matches!(
        &events[4],
        ProgressEvent::Skipped { reason: SkipReason::NoOptIn, .. }
    ));

    let detail = engine.detail(&ticket.campaign_id).unwrap();
    assert_eq!(detail.summary.status, CampaignStatus::Done);
    assert_eq!(engine.quota().used(&client), 2);
}

#[tokio::test(start_paused = true)]
async fn test_client_without_ready_session_cannot_send() {
    let mut herald: Herald = ron::from_str(EXAMPLE).unwrap();
    herald.sessions_ready.clear();
    herald.campaigns[0].dry_run = false;

    let client = ClientId::from("line-1");
    let sink = Arc::new(BroadcastSink::new(64));
    let engine = herald.engine(sink.clone());
    let mut rx = sink.subscribe(&client);

    let ticket = engine.start_campaign(herald.campaigns.remove(0)).unwrap();

    let mut failed = 0;
    let collect = async {
        loop {
            let update = rx.recv().await.unwrap();
            match update.event {
                ProgressEvent::Failed { ref error, .. } => {
                    assert!(error.contains("not_ready"), "{error}");
                    failed += 1;
                }
                ProgressEvent::Sent { .. } => panic!("sent without a ready session"),
                ref event if event.is_final() => break,
                _ => {}
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(3600), collect)
        .await
        .unwrap();

    assert_eq!(failed, 2);
    let stats = engine.detail(&ticket.campaign_id).unwrap().summary.stats;
    assert_eq!(stats.retried, 4);
    assert_eq!(engine.quota().used(&client), 0);
}
