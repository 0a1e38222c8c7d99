//! Session readiness tracking
//!
//! The transport layer owns the actual sessions; it reports their state here.
//! [`ReadinessGuard`] wraps any [`Deliver`] implementation and refuses to
//! deliver for a client whose session is not `ready`, failing fast with
//! [`DeliveryError::NotReady`] instead of reaching the network.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use herald_common::{ClientId, tracing};
use serde::{Deserialize, Serialize};

use crate::{
    error::DeliveryError,
    transport::{Deliver, DeliveryReceipt, OutboundMessage},
};

/// Lifecycle state of a client's session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Connecting,
    WaitingQr,
    Ready,
    Reconnecting,
    #[default]
    Disconnected,
}

/// Point-in-time view of a client's session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub client_id: ClientId,
    pub status: SessionStatus,
    pub reason: String,
    pub last_ready_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
struct SessionState {
    status: SessionStatus,
    reason: String,
    last_ready_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<ClientId, SessionState>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a status change reported by the transport
    pub fn set_status(&self, client: &ClientId, status: SessionStatus, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::debug!(client_id = %client, ?status, reason = %reason, "Session status changed");

        let mut state = self.sessions.entry(client.clone()).or_default();
        state.status = status;
        state.reason = reason;
        if status == SessionStatus::Ready {
            state.last_ready_at = Some(Utc::now());
        }
    }

    /// Current status, `disconnected` for unknown clients
    #[must_use]
    pub fn status(&self, client: &ClientId) -> SessionStatus {
        self.sessions
            .get(client)
            .map_or(SessionStatus::Disconnected, |state| state.status)
    }

    #[must_use]
    pub fn is_ready(&self, client: &ClientId) -> bool {
        self.status(client) == SessionStatus::Ready
    }

    #[must_use]
    pub fn view(&self, client: &ClientId) -> SessionView {
        let state = self
            .sessions
            .get(client)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        SessionView {
            client_id: client.clone(),
            status: state.status,
            reason: state.reason,
            last_ready_at: state.last_ready_at,
        }
    }

    /// Forget a client entirely (e.g. after a logout)
    pub fn remove(&self, client: &ClientId) {
        self.sessions.remove(client);
    }
}

/// Fails deliveries for clients whose session is not ready
#[derive(Debug)]
pub struct ReadinessGuard<D> {
    sessions: Arc<SessionRegistry>,
    inner: D,
}

impl<D> ReadinessGuard<D> {
    pub const fn new(sessions: Arc<SessionRegistry>, inner: D) -> Self {
        Self { sessions, inner }
    }
}

#[async_trait]
impl<D: Deliver> Deliver for ReadinessGuard<D> {
    async fn deliver(
        &self,
        client: &ClientId,
        message: &OutboundMessage,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        if !self.sessions.is_ready(client) {
            return Err(DeliveryError::NotReady(client.clone()));
        }

        self.inner.deliver(client, message).await
    }
}
