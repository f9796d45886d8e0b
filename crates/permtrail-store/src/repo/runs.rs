//! Row-level access to the `audit_runs` ledger.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use permtrail_core::errors::{ExError, ExErrorKind};
use permtrail_core::model::AuditRun;
use rusqlite::Connection;

/// Append one terminal run to the ledger. Every attempt gets its own row,
/// so a run id reused by a retry is recorded again.
///
/// `final_stage` is the stage a failed run failed in, otherwise the
/// terminal stage.
pub fn insert_run(conn: &Connection, run: &AuditRun) -> Result<()> {
    if !run.is_terminal() {
        return Err(ExError::new(ExErrorKind::InvalidInput)
            .with_op("record_run")
            .with_run_id(run.run_id().clone())
            .with_message(format!("run is still {}", run.status())));
    }

    let degradations = serde_json::to_string(run.degradations()).map_err(|e| {
        ExError::new(ExErrorKind::Serialization)
            .with_op("record_run")
            .with_message(format!("Failed to serialize degradations: {}", e))
    })?;

    conn.execute(
        "INSERT INTO audit_runs (
            run_id, target, status, final_stage, started_at, completed_at,
            baseline_digest, baseline_entries, current_digest, current_entries,
            change_count, persist_outcome, notify_result, failure, degradations
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        rusqlite::params![
            run.run_id().as_str(),
            run.target(),
            run.status().as_str(),
            run.failed_at().unwrap_or(run.stage()).as_str(),
            run.started_at().timestamp_millis(),
            run.completed_at().map(|t| t.timestamp_millis()),
            run.baseline().map(|s| s.digest.as_str()),
            run.baseline().map(|s| s.entries as i64),
            run.current().map(|s| s.digest.as_str()),
            run.current().map(|s| s.entries as i64),
            run.changeset().len() as i64,
            run.persist_outcome().map(|o| o.as_str()),
            run.notify_result().map(|n| n.as_str()),
            run.failure(),
            degradations,
        ],
    )
    .map_err(|e| from_rusqlite(e).with_op("record_run").with_run_id(run.run_id().clone()))?;

    Ok(())
}
