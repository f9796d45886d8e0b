//! permtrail core - permission snapshot auditing kernel
//!
//! This crate holds everything about an audit that does not touch a process,
//! a database or the network:
//! - Snapshot parsing and capture digests
//! - The pure snapshot diff and its plain-text and HTML renderings
//! - The audit run stage machine
//! - Collaborator seams (`PermissionSource`, `Trigger`, `ChangeStore`,
//!   `AlertSink`) and the best-effort `Notifier`
//! - The error and logging facilities shared by every permtrail crate

pub mod change_store;
pub mod config;
pub mod diff;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod notify;
pub mod render;
pub mod snapshot;
pub mod source;

/// Re-exported so the logging macros can name schema constants
pub use permtrail_core_types as core_types;

// Re-export commonly used types
pub use change_store::{AppendOutcome, BatchStatus, ChangeQuery, ChangeStore, StoredChange};
pub use config::AuditConfig;
pub use errors::{AuditError, ExError, ExErrorKind, Result};
pub use model::{AuditRun, ChangeKind, ChangeRecord, Changeset, RunStage, RunStatus, Snapshot};
pub use notify::{AlertSink, Notifier, NotifyResult};
pub use permtrail_core_types::RunId;
pub use source::{PermissionSource, Trigger};
