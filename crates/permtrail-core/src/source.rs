//! Capture-side collaborators: the permission source and the trigger that
//! separates the baseline capture from the current capture.

use crate::errors::ExError;
use std::time::Duration;

/// Produces raw permission listings for a target directory.
///
/// The core depends only on this signature and on the line format parsed by
/// [`crate::snapshot::parser`]. Implementations are responsible for bounding
/// their own run time.
#[allow(clippy::result_large_err)]
pub trait PermissionSource: Send + Sync {
    /// Capture the current permission state of `target`.
    ///
    /// # Errors
    ///
    /// - `ExErrorKind::Capture` if the source is unreachable, exits
    ///   unsuccessfully or returns no output
    /// - `ExErrorKind::Timeout` if the source does not finish in time
    fn capture(&self, target: &str) -> Result<Vec<u8>, ExError>;
}

/// Signals that the "after" state should be captured.
///
/// Operator confirmation, a timer or a filesystem event all fit behind this
/// trait. The orchestrator passes the configured timeout; `None` waits
/// without a deadline.
#[allow(clippy::result_large_err)]
pub trait Trigger: Send + Sync {
    /// Block until signalled.
    ///
    /// # Errors
    ///
    /// - `ExErrorKind::Timeout` if no signal arrived within `timeout`
    /// - `ExErrorKind::Cancelled` if the signal source went away
    fn wait(&self, timeout: Option<Duration>) -> Result<(), ExError>;
}
