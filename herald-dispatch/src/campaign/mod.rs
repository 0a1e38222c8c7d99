//! Campaign model, storage and processing

mod engine;
mod process;
pub mod store;
pub mod template;
pub mod types;

pub use engine::{CampaignEngine, CampaignEngineBuilder, DispatchContext};
pub use store::{CampaignRecord, CampaignStore};
pub use types::{
    CampaignDetail, CampaignId, CampaignRequest, CampaignStatus, CampaignSummary, CampaignTicket,
    Item, PauseReason, RecipientEntry, Stats,
};
