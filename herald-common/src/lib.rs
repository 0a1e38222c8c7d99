//! Types shared by every herald crate: canonical client and recipient
//! identifiers, logging setup, and the shutdown signal.

pub mod identity;
pub mod logging;

pub use identity::{ClientId, RecipientId, normalize};
pub use tracing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
    Finalised,
}
