use std::{
    collections::BTreeSet,
    sync::{Arc, LazyLock},
    time::Duration,
};

use herald_common::{ClientId, Signal, internal, logging, tracing};
use herald_dispatch::{
    BroadcastSink, CampaignEngine, CampaignRequest, CampaignUpdate, DispatchConfig, ProgressSink,
    QuotaTracker, ReadinessGuard, SessionRegistry, SessionStatus, TracingSink,
};
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::{error::ConfigError, loopback::LoopbackTransport};

const fn default_quota_reset_interval() -> u64 {
    86_400
}

/// Host configuration, read from `herald.config.ron`
#[derive(Debug, Deserialize)]
pub struct Herald {
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// How often every client's daily quota is cleared (in seconds)
    ///
    /// Default: 86400 (24 hours)
    #[serde(default = "default_quota_reset_interval")]
    pub quota_reset_interval_secs: u64,

    /// Log level (`trace` through `error`); `LOG_LEVEL` takes precedence
    #[serde(default)]
    pub log_level: Option<String>,

    /// Recipients seeded into the opt-in list at start-up
    #[serde(default)]
    pub opt_in: Vec<String>,

    /// Recipients seeded into the opt-out list at start-up
    #[serde(default)]
    pub opt_out: Vec<String>,

    /// Clients whose loopback session starts out ready
    #[serde(default)]
    pub sessions_ready: Vec<ClientId>,

    /// Campaigns submitted once start-up completes
    #[serde(default, alias = "campaign")]
    pub campaigns: Vec<CampaignRequest>,
}

impl Default for Herald {
    fn default() -> Self {
        Self {
            dispatch: DispatchConfig::default(),
            quota_reset_interval_secs: default_quota_reset_interval(),
            log_level: None,
            opt_in: Vec::new(),
            opt_out: Vec::new(),
            sessions_ready: Vec::new(),
            campaigns: Vec::new(),
        }
    }
}

pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

async fn shutdown() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!("CTRL+C entered -- Enter it again to force shutdown");
        }
        _ = terminate.recv() => {
            internal!("Terminate Signal received, shutting down");
        }
    };

    SHUTDOWN_BROADCAST
        .send(Signal::Shutdown)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Interrupted, e.to_string()))?;

    Ok(())
}

/// Clear every quota counter once per `period` until shutdown
pub async fn reset_quotas(
    quota: Arc<QuotaTracker>,
    period: Duration,
    mut shutdown: broadcast::Receiver<Signal>,
) {
    let mut timer = tokio::time::interval(period);

    // The first tick completes immediately
    timer.tick().await;

    loop {
        tokio::select! {
            _ = timer.tick() => quota.reset_all(),
            sig = shutdown.recv() => {
                match sig {
                    Ok(Signal::Shutdown | Signal::Finalised) => {
                        internal!("Quota scheduler received shutdown signal");
                    }
                    Err(e) => {
                        tracing::error!("Quota scheduler shutdown channel error: {e}");
                    }
                }
                break;
            }
        }
    }
}

/// Log every progress update for one client until shutdown
pub async fn report_progress(
    mut updates: broadcast::Receiver<CampaignUpdate>,
    mut shutdown: broadcast::Receiver<Signal>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                match update {
                    Ok(update) => TracingSink.emit(&update.client_id, &update.campaign_id, update.event),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "Progress reporter fell behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}

impl Herald {
    /// Check the configuration without starting anything
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dispatch.validate().map_err(ConfigError::Dispatch)?;

        if self.quota_reset_interval_secs == 0 {
            return Err(ConfigError::ZeroResetInterval);
        }

        for (index, campaign) in self.campaigns.iter().enumerate() {
            if campaign.client_id.is_blank() {
                return Err(ConfigError::MissingClientId { index });
            }
            if campaign.message_template.is_none() {
                return Err(ConfigError::MissingTemplate { index });
            }
        }

        Ok(())
    }

    /// Build the engine this configuration describes
    ///
    /// Delivery goes through the loopback transport, guarded by session
    /// readiness; only clients listed in `sessions_ready` can send.
    #[must_use]
    pub fn engine(&self, sink: Arc<dyn ProgressSink>) -> CampaignEngine {
        let sessions = Arc::new(SessionRegistry::new());
        for client in &self.sessions_ready {
            sessions.set_status(client, SessionStatus::Ready, "loopback");
        }

        let transport = Arc::new(ReadinessGuard::new(sessions, LoopbackTransport::new()));
        let engine = CampaignEngine::builder(transport)
            .config(self.dispatch.clone())
            .sink(sink)
            .build();

        engine.consent().add_opt_in(&self.opt_in);
        engine.consent().add_opt_out(&self.opt_out);

        engine
    }

    /// Run the dispatcher until a shutdown signal arrives
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the signal
    /// handlers cannot be installed.
    pub async fn run(self) -> anyhow::Result<()> {
        logging::init(self.log_level.as_deref());
        self.validate()?;

        internal!(level = INFO, "Herald starting");

        let sink = Arc::new(BroadcastSink::new(self.dispatch.event_buffer));
        let engine = self.engine(sink.clone());

        let clients: BTreeSet<_> = self
            .campaigns
            .iter()
            .map(|campaign| campaign.client_id.clone())
            .collect();
        for client in &clients {
            tokio::spawn(report_progress(
                sink.subscribe(client),
                SHUTDOWN_BROADCAST.subscribe(),
            ));
        }

        for request in self.campaigns {
            match engine.start_campaign(request) {
                Ok(ticket) => tracing::info!(
                    campaign_id = %ticket.campaign_id,
                    total = ticket.total,
                    eligible = ticket.eligible,
                    "Campaign submitted"
                ),
                Err(e) => tracing::error!("Failed to submit campaign: {e}"),
            }
        }

        let quotas = tokio::spawn(reset_quotas(
            Arc::clone(&engine.context().quota),
            Duration::from_secs(self.quota_reset_interval_secs),
            SHUTDOWN_BROADCAST.subscribe(),
        ));

        let ret = shutdown().await;

        if ret.is_err() {
            quotas.abort();
        } else if let Err(e) = quotas.await {
            tracing::error!("Quota scheduler failed: {e}");
        }

        internal!("Shutting down...");

        ret
    }
}
