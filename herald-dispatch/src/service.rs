//! Service trait abstraction for campaign operations
//!
//! Command surfaces (a control socket, an HTTP layer, tests) talk to the
//! dispatcher through [`CampaignQueryService`] instead of the concrete
//! [`CampaignEngine`], so they can be exercised against a mock.

use herald_common::ClientId;

use crate::{
    campaign::{CampaignDetail, CampaignEngine, CampaignId, CampaignSummary},
    consent::ConsentLists,
    quota::QuotaStats,
};

/// Service trait for querying campaign state and issuing control commands
///
/// # Example
///
/// ```rust,ignore
/// fn running(service: &dyn CampaignQueryService) -> usize {
///     service
///         .list_campaigns()
///         .iter()
///         .filter(|summary| !summary.status.is_terminal())
///         .count()
/// }
/// ```
pub trait CampaignQueryService: Send + Sync {
    /// Every campaign, oldest first
    fn list_campaigns(&self) -> Vec<CampaignSummary>;

    /// Full snapshot of one campaign
    ///
    /// Returns `None` if the campaign does not exist.
    fn campaign_detail(&self, id: &CampaignId) -> Option<CampaignDetail>;

    /// Request cancellation of a running campaign
    ///
    /// Returns `false` if the campaign does not exist. A campaign that has
    /// already stopped keeps its status.
    fn cancel_campaign(&self, id: &CampaignId) -> bool;

    /// Daily quota usage for `client`
    fn quota_stats(&self, client: &ClientId) -> QuotaStats;

    /// Current opt-in and opt-out lists
    fn consent_lists(&self) -> ConsentLists;
}

impl CampaignQueryService for CampaignEngine {
    fn list_campaigns(&self) -> Vec<CampaignSummary> {
        self.list()
    }

    fn campaign_detail(&self, id: &CampaignId) -> Option<CampaignDetail> {
        self.detail(id)
    }

    fn cancel_campaign(&self, id: &CampaignId) -> bool {
        self.cancel(id)
    }

    fn quota_stats(&self, client: &ClientId) -> QuotaStats {
        Self::quota_stats(self, client)
    }

    fn consent_lists(&self) -> ConsentLists {
        self.consent().lists()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use herald_common::RecipientId;

    use super::*;
    use crate::{
        error::DeliveryError,
        transport::{Deliver, DeliveryReceipt, OutboundMessage},
    };

    struct Unreachable;

    #[async_trait]
    impl Deliver for Unreachable {
        async fn deliver(
            &self,
            client: &ClientId,
            _message: &OutboundMessage,
        ) -> Result<DeliveryReceipt, DeliveryError> {
            Err(DeliveryError::SessionNotFound(client.clone()))
        }
    }

    #[test]
    fn test_engine_as_query_service() {
        let engine = CampaignEngine::builder(Arc::new(Unreachable)).build();
        engine.consent().add_opt_in(["+57 300 000 0002", "573000000001"]);
        engine.consent().add_opt_out(["573000000009"]);
        engine.quota().increment(&ClientId::from("line-1"), 100);

        let service: &dyn CampaignQueryService = &engine;

        let lists = service.consent_lists();
        assert_eq!(
            lists.opt_in,
            [
                RecipientId::parse("573000000001").unwrap(),
                RecipientId::parse("573000000002").unwrap(),
            ]
        );
        assert_eq!(lists.opt_out.len(), 1);

        let stats = service.quota_stats(&ClientId::from("line-1"));
        assert_eq!(stats.used, 100);
        assert_eq!(stats.remaining, 300);
        assert_eq!(stats.percentage, 25);

        assert!(service.list_campaigns().is_empty());
        assert!(service.campaign_detail(&CampaignId::generate()).is_none());
        assert!(!service.cancel_campaign(&CampaignId::generate()));
    }
}
