//! Alert transport interface.

use crate::errors::ExError;

/// Delivers one alert message to one recipient.
///
/// Implementations wrap a transport (mail drop, SMTP relay, chat webhook).
/// The trait is object-safe for use behind `Arc<dyn AlertSink>`.
#[allow(clippy::result_large_err)]
pub trait AlertSink: Send + Sync {
    /// Send an alert.
    ///
    /// # Errors
    ///
    /// Returns `ExErrorKind::Notify` if the transport is unreachable or
    /// rejects the message.
    fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), ExError>;
}
