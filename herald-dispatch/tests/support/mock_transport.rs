//! Scriptable delivery capability for campaign tests
#![allow(dead_code)] // Test utility module - not all methods used in every test
//!
//! Every call is recorded. Responses are taken from a script in order; once
//! the script runs out the fallback behaviour applies to every further call.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use async_trait::async_trait;
use herald_common::ClientId;
use herald_dispatch::{
    CampaignId, CampaignUpdate, DeliveryError, DeliveryKind, DeliveryReceipt, ImagePayload,
    OutboundMessage, ProgressEvent, transport::Deliver,
};
use parking_lot::Mutex;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub enum Behaviour {
    Succeed,
    Fail(DeliveryError),
    Panic(&'static str),
}

#[derive(Debug)]
pub struct MockTransport {
    script: Mutex<VecDeque<Behaviour>>,
    fallback: Behaviour,
    calls: Mutex<Vec<(ClientId, OutboundMessage)>>,
}

impl MockTransport {
    pub fn succeeding() -> Arc<Self> {
        Self::with_fallback(Behaviour::Succeed)
    }

    pub fn failing(error: DeliveryError) -> Arc<Self> {
        Self::with_fallback(Behaviour::Fail(error))
    }

    pub fn with_fallback(fallback: Behaviour) -> Arc<Self> {
        Self::scripted([], fallback)
    }

    pub fn scripted(
        script: impl IntoIterator<Item = Behaviour>,
        fallback: Behaviour,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(ClientId, OutboundMessage)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Deliver for MockTransport {
    async fn deliver(
        &self,
        client: &ClientId,
        message: &OutboundMessage,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let n = {
            let mut calls = self.calls.lock();
            calls.push((client.clone(), message.clone()));
            calls.len()
        };

        let behaviour = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match behaviour {
            Behaviour::Succeed => {
                let kind = match message.image.as_deref().map(ImagePayload::parse) {
                    None => DeliveryKind::Text,
                    Some(payload) => payload?.kind(),
                };
                Ok(DeliveryReceipt {
                    delivery_id: format!("msg-{n}"),
                    kind,
                })
            }
            Behaviour::Fail(error) => Err(error),
            Behaviour::Panic(message) => panic!("{message}"),
        }
    }
}

/// Collect `campaign`'s events up to and including its final one
pub async fn drain(
    rx: &mut broadcast::Receiver<CampaignUpdate>,
    campaign: CampaignId,
) -> Vec<ProgressEvent> {
    let collect = async {
        let mut events = Vec::new();
        loop {
            let update = rx.recv().await.expect("progress channel closed or lagged");
            if update.campaign_id != campaign {
                continue;
            }
            let last = update.event.is_final();
            events.push(update.event);
            if last {
                return events;
            }
        }
    };

    tokio::time::timeout(Duration::from_secs(24 * 3600), collect)
        .await
        .expect("campaign never finished")
}

/// Event names in order, for compact assertions
pub fn names(events: &[ProgressEvent]) -> Vec<&'static str> {
    events.iter().map(ProgressEvent::name).collect()
}
