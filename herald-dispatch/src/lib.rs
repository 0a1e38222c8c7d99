//! Bulk campaign dispatcher
//!
//! Sends one templated message to many recipients through a single client
//! channel while respecting:
//! - consent (opt-in, opt-out and a spam blacklist)
//! - a per-client daily quota
//! - human-like pacing, serialized per client
//! - bounded retries, with a campaign-wide halt on spam signals
//!
//! Progress is reported through a [`ProgressSink`].

pub mod campaign;
pub mod config;
pub mod consent;
mod error;
pub mod events;
pub mod gate;
pub mod policy;
pub mod quota;
pub mod service;
pub mod session;
pub mod throttle;
pub mod transport;

pub use campaign::{
    CampaignDetail, CampaignEngine, CampaignEngineBuilder, CampaignId, CampaignRequest,
    CampaignStatus, CampaignSummary, CampaignTicket, DispatchContext, PauseReason,
    RecipientEntry, Stats,
};
pub use config::DispatchConfig;
pub use consent::{ConsentLists, ConsentRegistry, Eligibility, SkipReason};
pub use error::{DeliveryError, DispatchError, InputError};
pub use events::{BroadcastSink, CampaignUpdate, ProgressEvent, ProgressSink, TracingSink};
pub use gate::{DeliveryGate, FailureClassifier, FailureKind, SubstringClassifier, Verdict};
pub use policy::{AlwaysOpen, QuietHours, RetryPolicy};
pub use quota::{QuotaStats, QuotaTracker};
pub use service::CampaignQueryService;
pub use session::{ReadinessGuard, SessionRegistry, SessionStatus, SessionView};
pub use throttle::{ClientThrottle, ThrottleRegistry};
pub use transport::{Deliver, DeliveryKind, DeliveryReceipt, ImagePayload, OutboundMessage};
