//! Delivery failure classification and policy
//!
//! The gate turns a raw [`DeliveryError`] into a [`FailureKind`] and then into
//! a [`Verdict`] the campaign engine acts on.
//!
//! # Classification is best-effort
//!
//! The default [`SubstringClassifier`] looks for signal words in the error
//! message. Transports are not obliged to use those words, and unrelated
//! messages can contain them (`"rate"` also matches `"generate"`), so the
//! result is a hint rather than a guaranteed taxonomy. Classifiers are
//! pluggable through [`FailureClassifier`] so a structured error-code
//! contract can replace the matching without touching the engine.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{error::DeliveryError, policy::RetryPolicy};

/// Coarse failure taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotReady,
    Spammy,
    Rate,
    Timeout,
    Generic,
}

impl FailureKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotReady => "not_ready",
            Self::Spammy => "spammy",
            Self::Rate => "rate",
            Self::Timeout => "timeout",
            Self::Generic => "generic",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a delivery error to a failure kind.
pub trait FailureClassifier: Send + Sync + std::fmt::Debug {
    fn classify(&self, error: &DeliveryError) -> FailureKind;
}

/// Ordered, case-sensitive substring rules; first match wins.
const RULES: &[(FailureKind, &[&str])] = &[
    (FailureKind::NotReady, &["not_ready"]),
    (FailureKind::Spammy, &["spam", "blocked"]),
    (FailureKind::Rate, &["too many", "rate"]),
    (FailureKind::Timeout, &["timed out", "timeout"]),
];

/// Classifies by scanning the error message for signal words
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringClassifier;

impl SubstringClassifier {
    #[must_use]
    pub fn classify_message(message: &str) -> FailureKind {
        RULES
            .iter()
            .find(|(_, needles)| needles.iter().any(|needle| message.contains(needle)))
            .map_or(FailureKind::Generic, |(kind, _)| *kind)
    }
}

impl FailureClassifier for SubstringClassifier {
    fn classify(&self, error: &DeliveryError) -> FailureKind {
        Self::classify_message(&error.to_string())
    }
}

/// What the engine should do about a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Wait `backoff`, then try the same item again.
    Retry { backoff: Duration },
    /// Count the item as failed and continue with the next one.
    Fail,
    /// Blacklist the recipient, count the item as failed and pause the campaign.
    Halt,
}

/// Classification plus the decision derived from it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assessment {
    pub kind: FailureKind,
    pub verdict: Verdict,
}

#[derive(Debug, Clone)]
pub struct DeliveryGate {
    classifier: Arc<dyn FailureClassifier>,
    retry: RetryPolicy,
}

impl DeliveryGate {
    #[must_use]
    pub fn new(retry: RetryPolicy) -> Self {
        Self::with_classifier(retry, Arc::new(SubstringClassifier))
    }

    #[must_use]
    pub fn with_classifier(retry: RetryPolicy, classifier: Arc<dyn FailureClassifier>) -> Self {
        Self { classifier, retry }
    }

    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Decide what to do after an attempt failed.
    ///
    /// `attempts_so_far` is the number of failed attempts on this item before
    /// this one.
    #[must_use]
    pub fn assess(&self, error: &DeliveryError, attempts_so_far: u32) -> Assessment {
        let kind = self.classifier.classify(error);

        let verdict = match kind {
            FailureKind::Spammy => Verdict::Halt,
            _ if self.retry.should_retry(attempts_so_far) => Verdict::Retry {
                backoff: self.retry.backoff(),
            },
            _ => Verdict::Fail,
        };

        Assessment { kind, verdict }
    }
}

impl Default for DeliveryGate {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
