//! SQLite-backed [`ChangeStore`].
//!
//! One connection behind a mutex. Every append is a single immediate
//! transaction, so concurrent runs in one process never interleave rows and
//! other processes wait on the database lock (bounded by the busy timeout).

#![allow(clippy::result_large_err)]

use crate::db;
use crate::errors::{from_rusqlite, lock_poisoned, Result};
use crate::migrations::apply_migrations;
use crate::repo::{changes, runs};
use permtrail_core::change_store::{
    AppendOutcome, BatchStatus, ChangeQuery, ChangeStore, StoredChange,
};
use permtrail_core::errors::{ExError, ExErrorKind};
use permtrail_core::model::{AuditRun, Changeset};
use permtrail_core_types::RunId;
use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub struct SqliteChangeStore {
    conn: Mutex<Connection>,
}

impl SqliteChangeStore {
    /// Open (or create) the database at `path` and bring its schema up to date
    ///
    /// # Errors
    ///
    /// - `ExErrorKind::Io` if the parent directory cannot be created
    /// - `ExErrorKind::Persistence` if the database cannot be opened or migrated
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = db::open(path)?;
        Self::from_connection(conn)
    }

    /// Open a store that an earlier run created, for read-mostly commands
    ///
    /// # Errors
    ///
    /// - `ExErrorKind::NotFound` if no database exists at `path`
    /// - `ExErrorKind::Persistence` if the database cannot be opened or migrated
    pub fn open_existing<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = db::open_existing(path)?;
        Self::from_connection(conn)
    }

    /// In-memory store, mostly for tests
    ///
    /// # Errors
    ///
    /// `ExErrorKind::Persistence` if SQLite fails to initialize.
    pub fn in_memory() -> Result<Self> {
        let conn = db::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Rebuild the changeset stored for one run, in stored order
    ///
    /// # Errors
    ///
    /// `ExErrorKind::Persistence` if storage is unavailable.
    pub fn changeset_for_run(&self, run_id: &RunId) -> Result<Changeset> {
        let conn = self.lock("changeset_for_run")?;
        changes::stored_changeset(&conn, run_id)
    }

    fn lock(&self, op: &str) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| lock_poisoned(op))
    }
}

impl ChangeStore for SqliteChangeStore {
    fn append(&self, run_id: &RunId, changeset: &Changeset) -> Result<AppendOutcome> {
        if changeset.is_empty() {
            return Ok(AppendOutcome::Empty);
        }

        let mut conn = self.lock("append")?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(from_rusqlite)?;

        match changes::batch_status(&tx, run_id)? {
            BatchStatus::Missing => {}
            BatchStatus::Complete => {
                let stored = changes::stored_changeset(&tx, run_id)?;
                if stored.same_changes(changeset) {
                    tracing::debug!(run_id = %run_id, "Changeset already recorded");
                    return Ok(AppendOutcome::Duplicate);
                }
                return Err(ExError::new(ExErrorKind::Persistence)
                    .with_op("append")
                    .with_run_id(run_id.clone())
                    .with_message(format!(
                        "run id already recorded with a different changeset ({} stored, {} offered)",
                        stored.len(),
                        changeset.len()
                    )));
            }
            BatchStatus::Partial { expected, found } => {
                return Err(ExError::new(ExErrorKind::Persistence)
                    .with_op("append")
                    .with_run_id(run_id.clone())
                    .with_message(format!(
                        "batch is partial (ledger {} rows, stored {}); refusing to append",
                        expected, found
                    )));
            }
        }

        let rows = changes::insert_batch(&tx, run_id, changeset)
            .map_err(|e| e.with_op("append").with_run_id(run_id.clone()))?;
        tx.commit().map_err(from_rusqlite)?;

        tracing::debug!(run_id = %run_id, rows, "Appended changeset");
        Ok(AppendOutcome::Appended { rows })
    }

    fn query(&self, query: &ChangeQuery) -> Result<Vec<StoredChange>> {
        let conn = self.lock("query")?;
        changes::query_changes(&conn, query)
    }

    fn batch_status(&self, run_id: &RunId) -> Result<BatchStatus> {
        let conn = self.lock("batch_status")?;
        changes::batch_status(&conn, run_id)
    }

    fn record_run(&self, run: &AuditRun) -> Result<()> {
        let conn = self.lock("record_run")?;
        runs::insert_run(&conn, run)
    }
}

impl std::fmt::Debug for SqliteChangeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteChangeStore").finish_non_exhaustive()
    }
}
