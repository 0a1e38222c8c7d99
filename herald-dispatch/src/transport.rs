//! Contract with the delivery capability
//!
//! The dispatcher never talks to a messaging network itself. A transport
//! implements [`Deliver`] and reports failures as [`DeliveryError`]s whose
//! messages the gate can classify.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use herald_common::{ClientId, RecipientId};
use serde::{Deserialize, Serialize};

use crate::error::DeliveryError;

/// One rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub recipient: RecipientId,
    pub text: String,
    /// Raw image payload as submitted with the campaign; see [`ImagePayload::parse`]
    pub image: Option<String>,
}

/// What kind of message the transport ended up sending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryKind {
    Text,
    ImageUrl,
    ImageBase64,
}

/// Acknowledgement of a successful delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub delivery_id: String,
    pub kind: DeliveryKind,
}

/// Delivery capability for one client's outbound channel
#[async_trait]
pub trait Deliver: Send + Sync {
    /// Deliver one message on `client`'s channel.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] describing why the message was not delivered.
    async fn deliver(
        &self,
        client: &ClientId,
        message: &OutboundMessage,
    ) -> Result<DeliveryReceipt, DeliveryError>;
}

/// Decoded image attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    /// Remote image the network fetches itself
    Url(String),
    /// Inline image from a `data:<mime>;base64,<data>` URI
    Inline { mime_type: String, data: Vec<u8> },
}

impl ImagePayload {
    /// Interpret a raw image string.
    ///
    /// Accepts anything starting with `http` as a URL and
    /// `data:<mime>;base64,<data>` URIs. Invalid payloads are only detected
    /// here, at delivery time, never when the campaign is created.
    ///
    /// # Errors
    ///
    /// [`DeliveryError::InvalidImage`] for a malformed data URI,
    /// [`DeliveryError::UnsupportedImage`] for anything else.
    pub fn parse(raw: &str) -> Result<Self, DeliveryError> {
        if raw.starts_with("http") {
            return Ok(Self::Url(raw.to_string()));
        }

        let Some(rest) = raw.strip_prefix("data:") else {
            return Err(DeliveryError::UnsupportedImage);
        };

        let (mime_type, encoded) = rest
            .split_once(";base64,")
            .filter(|(mime, data)| !mime.is_empty() && !data.is_empty())
            .ok_or_else(|| DeliveryError::InvalidImage("malformed data URI".to_string()))?;

        let data = STANDARD
            .decode(encoded)
            .map_err(|e| DeliveryError::InvalidImage(e.to_string()))?;

        Ok(Self::Inline {
            mime_type: mime_type.to_string(),
            data,
        })
    }

    #[must_use]
    pub const fn kind(&self) -> DeliveryKind {
        match self {
            Self::Url(_) => DeliveryKind::ImageUrl,
            Self::Inline { .. } => DeliveryKind::ImageBase64,
        }
    }
}
