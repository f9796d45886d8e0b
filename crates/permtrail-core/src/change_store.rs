//! Change store interface.
//!
//! The store is append-only: there is no update or delete at this layer.
//! `permtrail-store` provides the SQLite implementation.

use crate::errors::ExError;
use crate::model::{AuditRun, ChangeRecord, Changeset};
use chrono::{DateTime, Utc};
use permtrail_core_types::RunId;
use serde::{Deserialize, Serialize};

/// Result of appending one changeset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppendOutcome {
    /// All records were written in one transaction
    Appended { rows: usize },
    /// This run id was already recorded with the same changes; nothing was written
    Duplicate,
    /// The changeset was empty; nothing was written
    Empty,
}

/// Integrity of a run's recorded batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    /// No batch recorded for the run; safe to append
    Missing,
    /// Ledger row count matches the stored change rows
    Complete,
    /// Ledger and rows disagree; treat as not recorded
    Partial { expected: usize, found: usize },
}

/// One persisted change row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredChange {
    /// Auto-assigned row identifier
    pub id: i64,
    pub run_id: RunId,
    pub record: ChangeRecord,
}

/// Filter for [`ChangeStore::query`]; every field is optional and the
/// bounds on `observed_at` are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeQuery {
    pub path: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub run_id: Option<RunId>,
    pub limit: Option<usize>,
}

impl ChangeQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn since(mut self, at: DateTime<Utc>) -> Self {
        self.since = Some(at);
        self
    }

    pub fn until(mut self, at: DateTime<Utc>) -> Self {
        self.until = Some(at);
        self
    }

    pub fn for_run(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Durable, append-only changeset storage.
///
/// Implementations must tolerate concurrent `append` calls from independent
/// runs without interleaving partial writes.
#[allow(clippy::result_large_err)]
pub trait ChangeStore: Send + Sync {
    /// Atomically record every record of `changeset` under `run_id`.
    ///
    /// An empty changeset is a no-op. Appending again with a run id that is
    /// already recorded returns `Duplicate` and writes nothing if the records
    /// match the stored ones (observation times aside), and fails with
    /// `Persistence` if they differ.
    ///
    /// # Errors
    ///
    /// `ExErrorKind::Persistence` if storage is unavailable or corrupt. On
    /// error nothing has been recorded and the caller may retry with the
    /// same run id.
    fn append(&self, run_id: &RunId, changeset: &Changeset) -> Result<AppendOutcome, ExError>;

    /// Read back stored changes, ordered by observation time then row id.
    ///
    /// # Errors
    ///
    /// `ExErrorKind::Persistence` if storage is unavailable.
    fn query(&self, query: &ChangeQuery) -> Result<Vec<StoredChange>, ExError>;

    /// Check whether a run's batch is fully recorded.
    ///
    /// # Errors
    ///
    /// `ExErrorKind::Persistence` if storage is unavailable.
    fn batch_status(&self, run_id: &RunId) -> Result<BatchStatus, ExError>;

    /// Record a terminal audit run in the run ledger.
    ///
    /// Each call adds an attempt, so a retried run id is recorded once per try.
    ///
    /// # Errors
    ///
    /// - `ExErrorKind::InvalidInput` if the run is not terminal
    /// - `ExErrorKind::Persistence` if storage is unavailable
    fn record_run(&self, run: &AuditRun) -> Result<(), ExError>;
}
