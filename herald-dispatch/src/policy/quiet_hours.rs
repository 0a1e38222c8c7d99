//! Quiet-hours predicate
//!
//! Campaigns pause when the predicate reports quiet hours. No real time-window
//! policy ships with the dispatcher; hosts plug in their own.

/// Decides whether sending is currently suppressed.
pub trait QuietHours: Send + Sync + std::fmt::Debug {
    /// Returns `true` while sends must not go out.
    fn is_quiet(&self) -> bool;
}

/// Quiet hours that never start.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOpen;

impl QuietHours for AlwaysOpen {
    fn is_quiet(&self) -> bool {
        false
    }
}
