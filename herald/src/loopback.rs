//! Delivery capability that sends nowhere
//!
//! Stands in for a real messaging network so the host can run campaigns end
//! to end: every message is logged and acknowledged. Image payloads are still
//! validated, so a bad image fails exactly as it would on a real line.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use herald_common::ClientId;
use herald_dispatch::{
    DeliveryError, DeliveryKind, DeliveryReceipt, ImagePayload, OutboundMessage, transport::Deliver,
};

#[derive(Debug, Default)]
pub struct LoopbackTransport {
    delivered: AtomicU64,
}

impl LoopbackTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages acknowledged so far
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Deliver for LoopbackTransport {
    async fn deliver(
        &self,
        client: &ClientId,
        message: &OutboundMessage,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let kind = match message.image.as_deref() {
            Some(raw) => ImagePayload::parse(raw)?.kind(),
            None => DeliveryKind::Text,
        };

        let n = self.delivered.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(
            client_id = %client,
            recipient = %message.recipient,
            ?kind,
            text = %message.text,
            "Loopback delivery"
        );

        Ok(DeliveryReceipt {
            delivery_id: format!("loopback-{client}-{n}"),
            kind,
        })
    }
}
