pub mod change;
pub mod run;
pub mod snapshot;

pub use change::{ChangeKind, ChangeRecord, Changeset};
pub use run::{AuditRun, PersistOutcome, RunStage, RunStatus, SnapshotRef};
pub use snapshot::{PermissionDescriptor, Snapshot};
