//! Campaign creation and supervision

use std::sync::Arc;

use chrono::Utc;
use herald_common::{ClientId, RecipientId, campaign, tracing};

use super::{
    process,
    store::{CampaignMeta, CampaignRecord, CampaignStore},
    types::{CampaignDetail, CampaignId, CampaignRequest, CampaignSummary, CampaignTicket, Item},
};
use crate::{
    config::DispatchConfig,
    consent::ConsentRegistry,
    error::{DispatchError, InputError},
    events::{ProgressEvent, ProgressSink, TracingSink},
    gate::DeliveryGate,
    policy::{AlwaysOpen, QuietHours},
    quota::{QuotaStats, QuotaTracker},
    throttle::ThrottleRegistry,
    transport::Deliver,
};

/// Shared registries every campaign reads and writes
///
/// Owned by the host and injected into the engine, so one set of consent
/// lists, quotas and throttles can back several engines (or tests).
#[derive(Debug, Clone)]
pub struct DispatchContext {
    pub consent: Arc<ConsentRegistry>,
    pub quota: Arc<QuotaTracker>,
    pub throttles: Arc<ThrottleRegistry>,
    pub store: CampaignStore,
}

impl DispatchContext {
    #[must_use]
    pub fn new(config: &DispatchConfig) -> Self {
        Self {
            consent: Arc::new(ConsentRegistry::new()),
            quota: Arc::new(QuotaTracker::new(config.daily_cap)),
            throttles: Arc::new(ThrottleRegistry::new(config.min_spacing())),
            store: CampaignStore::new(),
        }
    }
}

pub(crate) struct EngineInner {
    pub(crate) config: DispatchConfig,
    pub(crate) context: DispatchContext,
    pub(crate) transport: Arc<dyn Deliver>,
    pub(crate) sink: Arc<dyn ProgressSink>,
    pub(crate) gate: DeliveryGate,
    pub(crate) quiet_hours: Arc<dyn QuietHours>,
}

impl EngineInner {
    pub(crate) fn emit(&self, meta: &CampaignMeta, event: ProgressEvent) {
        self.sink.emit(&meta.client_id, &meta.id, event);
    }
}

/// Builder for [`CampaignEngine`]
pub struct CampaignEngineBuilder {
    config: DispatchConfig,
    context: Option<DispatchContext>,
    transport: Arc<dyn Deliver>,
    sink: Arc<dyn ProgressSink>,
    gate: Option<DeliveryGate>,
    quiet_hours: Arc<dyn QuietHours>,
}

impl CampaignEngineBuilder {
    #[must_use]
    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Use existing registries instead of fresh ones built from the config
    #[must_use]
    pub fn context(mut self, context: DispatchContext) -> Self {
        self.context = Some(context);
        self
    }

    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Override the gate; by default one is built from `config.retry`
    #[must_use]
    pub fn gate(mut self, gate: DeliveryGate) -> Self {
        self.gate = Some(gate);
        self
    }

    #[must_use]
    pub fn quiet_hours(mut self, quiet_hours: Arc<dyn QuietHours>) -> Self {
        self.quiet_hours = quiet_hours;
        self
    }

    #[must_use]
    pub fn build(self) -> CampaignEngine {
        let context = self
            .context
            .unwrap_or_else(|| DispatchContext::new(&self.config));
        let gate = self
            .gate
            .unwrap_or_else(|| DeliveryGate::new(self.config.retry.clone()));

        CampaignEngine {
            inner: Arc::new(EngineInner {
                config: self.config,
                context,
                transport: self.transport,
                sink: self.sink,
                gate,
                quiet_hours: self.quiet_hours,
            }),
        }
    }
}

/// Accepts campaigns and runs each one on its own supervised task
#[derive(Clone)]
pub struct CampaignEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for CampaignEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CampaignEngine")
            .field("config", &self.inner.config)
            .field("campaigns", &self.inner.context.store.len())
            .finish_non_exhaustive()
    }
}

impl CampaignEngine {
    /// Start building an engine that delivers through `transport`.
    ///
    /// Defaults: [`DispatchConfig::default`], fresh registries, a
    /// [`TracingSink`], a gate built from the config's retry policy and
    /// [`AlwaysOpen`] quiet hours.
    pub fn builder(transport: Arc<dyn Deliver>) -> CampaignEngineBuilder {
        CampaignEngineBuilder {
            config: DispatchConfig::default(),
            context: None,
            transport,
            sink: Arc::new(TracingSink),
            gate: None,
            quiet_hours: Arc::new(AlwaysOpen),
        }
    }

    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn context(&self) -> &DispatchContext {
        &self.inner.context
    }

    #[must_use]
    pub fn consent(&self) -> &ConsentRegistry {
        &self.inner.context.consent
    }

    #[must_use]
    pub fn quota(&self) -> &QuotaTracker {
        &self.inner.context.quota
    }

    /// Validate and register a campaign, then start processing it.
    ///
    /// Recipients are normalized and classified against the consent lists
    /// once, here; entries with no digits are dropped. The `started` event
    /// has been emitted by the time this returns, and processing continues
    /// in the background.
    ///
    /// # Errors
    ///
    /// - [`InputError::MissingClientId`] if the client id is blank
    /// - [`InputError::MissingTemplate`] if no message template was given
    /// - [`DispatchError::System`] if called outside a tokio runtime
    ///
    /// No campaign is created when an error is returned.
    pub fn start_campaign(&self, request: CampaignRequest) -> Result<CampaignTicket, DispatchError> {
        if request.client_id.is_blank() {
            return Err(InputError::MissingClientId.into());
        }
        let Some(template) = request.message_template else {
            return Err(InputError::MissingTemplate.into());
        };
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|err| DispatchError::System(format!("no async runtime: {err}")))?;

        let consent = &self.inner.context.consent;
        let items: Vec<Item> = request
            .recipients
            .into_iter()
            .filter_map(|entry| {
                let recipient = RecipientId::parse(&entry.recipient)?;
                let eligibility = consent.eligibility(&recipient);
                Some(Item {
                    recipient,
                    vars: entry.vars,
                    eligibility,
                })
            })
            .collect();

        let total = u64::try_from(items.len()).unwrap_or(u64::MAX);
        let eligible = u64::try_from(
            items
                .iter()
                .filter(|item| item.eligibility.is_eligible())
                .count(),
        )
        .unwrap_or(u64::MAX);

        let id = CampaignId::generate();
        let title = request
            .title
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| format!("Campaign {id}"));

        let record = Arc::new(CampaignRecord::new(
            CampaignMeta {
                id,
                client_id: request.client_id,
                title: title.clone(),
                created_at: Utc::now(),
                template,
                image: request.image,
                dry_run: request.dry_run,
            },
            items,
        ));

        self.inner.context.store.insert(Arc::clone(&record));

        tracing::info!(
            campaign_id = %id,
            client_id = %record.meta().client_id,
            total,
            eligible,
            dry_run = record.meta().dry_run,
            "Campaign accepted"
        );

        self.inner.emit(
            record.meta(),
            ProgressEvent::Started {
                title,
                stats: record.stats(),
            },
        );

        runtime.spawn(supervise(Arc::clone(&self.inner), record));

        Ok(CampaignTicket {
            campaign_id: id,
            total,
            eligible,
        })
    }

    /// Request cancellation of a campaign.
    ///
    /// Returns `false` if no such campaign exists.
    pub fn cancel(&self, id: &CampaignId) -> bool {
        let found = self.inner.context.store.cancel(id);
        if found {
            campaign!(level = INFO, "Cancellation requested for campaign {}", id);
        }
        found
    }

    /// Every campaign, oldest first
    #[must_use]
    pub fn list(&self) -> Vec<CampaignSummary> {
        self.inner.context.store.list()
    }

    #[must_use]
    pub fn detail(&self, id: &CampaignId) -> Option<CampaignDetail> {
        self.inner.context.store.detail(id)
    }

    #[must_use]
    pub fn quota_stats(&self, client: &ClientId) -> QuotaStats {
        self.inner.context.quota.stats(client)
    }
}

/// Run a campaign's processing task and record `error` if it dies.
async fn supervise(inner: Arc<EngineInner>, record: Arc<CampaignRecord>) {
    let task = tokio::spawn(process::run(Arc::clone(&inner), Arc::clone(&record)));

    let error = match task.await {
        Ok(()) => return,
        Err(err) if err.is_panic() => {
            let payload = err.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            DispatchError::System(format!("campaign processing task panicked: {message}"))
        }
        Err(err) => DispatchError::System(format!("campaign processing task aborted: {err}")),
    }
    .to_string();

    tracing::error!(
        campaign_id = %record.meta().id,
        client_id = %record.meta().client_id,
        %error,
        "Campaign processing failed"
    );

    record.fail();
    inner.emit(record.meta(), ProgressEvent::Error { error });
}
