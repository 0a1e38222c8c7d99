//! Typed error handling for dispatch operations.
//!
//! - [`InputError`]: a campaign request was rejected before any state was created
//! - [`DeliveryError`]: a single delivery failed; handled per item by the gate
//! - [`DispatchError`]: top-level error for engine operations and processing tasks

use herald_common::ClientId;
use thiserror::Error;

/// Top-level dispatcher error type.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The campaign request was malformed.
    #[error("Invalid campaign request: {0}")]
    Input(#[from] InputError),

    /// The processing task itself failed.
    #[error("System error: {0}")]
    System(String),
}

impl DispatchError {
    /// Returns `true` if the caller supplied bad input.
    #[must_use]
    pub const fn is_input(&self) -> bool {
        matches!(self, Self::Input(_))
    }
}

/// Reasons a campaign request is rejected synchronously.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    /// No client id, or a blank one.
    #[error("missing client id")]
    MissingClientId,

    /// No message template was supplied.
    #[error("missing message template")]
    MissingTemplate,
}

/// Failure reported by a delivery capability for one message.
///
/// The display strings are what the gate's heuristic classifier inspects, so
/// variants keep the signal words (`not_ready`, `timed out`, ...) in them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The client's session is not in a ready state.
    #[error("not_ready: session for client {0} is not ready")]
    NotReady(ClientId),

    /// No session exists for the client.
    #[error("session not found for client {0}")]
    SessionNotFound(ClientId),

    /// The destination network refused the message.
    #[error("{0}")]
    Rejected(String),

    /// The delivery did not complete in time.
    #[error("delivery timed out: {0}")]
    TimedOut(String),

    /// The image payload is neither a URL nor a base64 data URI.
    #[error("unsupported image format")]
    UnsupportedImage,

    /// The image payload looked like a data URI but could not be decoded.
    #[error("invalid base64 image: {0}")]
    InvalidImage(String),

    /// Any other transport failure.
    #[error("{0}")]
    Transport(String),
}

impl DeliveryError {
    /// Returns `true` if the failure came from the session state rather than the network.
    #[must_use]
    pub const fn is_session(&self) -> bool {
        matches!(self, Self::NotReady(_) | Self::SessionNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_predicates() {
        let error = DispatchError::from(InputError::MissingClientId);
        assert!(error.is_input());

        let error = DispatchError::System("campaign vanished".to_string());
        assert!(!error.is_input());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            DispatchError::from(InputError::MissingTemplate).to_string(),
            "Invalid campaign request: missing message template"
        );
        assert_eq!(
            DeliveryError::NotReady(ClientId::from("line-1")).to_string(),
            "not_ready: session for client line-1 is not ready"
        );
        assert_eq!(
            DeliveryError::Rejected("blocked by policy".to_string()).to_string(),
            "blocked by policy"
        );
    }

    #[test]
    fn test_session_errors() {
        assert!(DeliveryError::NotReady(ClientId::from("a")).is_session());
        assert!(DeliveryError::SessionNotFound(ClientId::from("a")).is_session());
        assert!(!DeliveryError::UnsupportedImage.is_session());
    }
}
