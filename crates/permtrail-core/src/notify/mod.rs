//! Alert dispatch.
//!
//! The [`Notifier`] turns a changeset into one alert message and hands it to
//! an [`AlertSink`] exactly once. Delivery is best-effort: a failed send is
//! reported as [`NotifyResult::Failed`] and never retried here.

pub mod notifier;
pub mod sink;

pub use notifier::{Notifier, DEFAULT_SUBJECT};
pub use sink::AlertSink;

use serde::{Deserialize, Serialize};

/// Outcome of one notification attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyResult {
    /// The sink accepted the alert
    Sent,
    /// The sink failed, rejected the alert, or did not answer in time
    Failed(String),
    /// Nothing to report (empty changeset); the sink was not called
    Skipped,
}

impl NotifyResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyResult::Sent => "sent",
            NotifyResult::Failed(_) => "failed",
            NotifyResult::Skipped => "skipped",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, NotifyResult::Failed(_))
    }
}
