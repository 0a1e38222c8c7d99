//! Policy abstractions for dispatch operations.
//!
//! - [`RetryPolicy`]: bounded retries with a randomized backoff window
//! - [`QuietHours`]: predicate deciding whether sending is currently allowed

pub mod quiet_hours;
pub mod retry;

pub use quiet_hours::{AlwaysOpen, QuietHours};
pub use retry::RetryPolicy;
