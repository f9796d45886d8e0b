//! Row-level access to `permission_changes` and `change_batches`.
//!
//! Timestamps are stored as unix milliseconds; sub-millisecond precision of
//! `observed_at` does not survive a round trip.

#![allow(clippy::result_large_err)]

use crate::errors::{corrupt_row, from_rusqlite, Result};
use chrono::{DateTime, TimeZone, Utc};
use permtrail_core::change_store::{BatchStatus, ChangeQuery, StoredChange};
use permtrail_core::model::{ChangeKind, ChangeRecord, Changeset, PermissionDescriptor};
use permtrail_core_types::RunId;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Transaction};

/// Insert every record plus the batch ledger row; returns rows written
pub fn insert_batch(tx: &Transaction, run_id: &RunId, changeset: &Changeset) -> Result<usize> {
    let mut stmt = tx
        .prepare_cached(
            "INSERT INTO permission_changes
                (run_id, path, change_type, old_permission, new_permission, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .map_err(from_rusqlite)?;

    for record in changeset {
        stmt.execute(rusqlite::params![
            run_id.as_str(),
            record.path(),
            record.kind().as_str(),
            record.previous().map(|d| d.as_str()),
            record.current().map(|d| d.as_str()),
            record.observed_at().timestamp_millis(),
        ])
        .map_err(from_rusqlite)?;
    }

    tx.execute(
        "INSERT INTO change_batches (run_id, record_count, appended_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            run_id.as_str(),
            changeset.len() as i64,
            Utc::now().timestamp_millis()
        ],
    )
    .map_err(from_rusqlite)?;

    Ok(changeset.len())
}

/// Compare the ledger row for `run_id` with the change rows actually stored
pub fn batch_status(conn: &Connection, run_id: &RunId) -> Result<BatchStatus> {
    let expected: Option<i64> = conn
        .query_row(
            "SELECT record_count FROM change_batches WHERE run_id = ?1",
            [run_id.as_str()],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)?;

    let found: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM permission_changes WHERE run_id = ?1",
            [run_id.as_str()],
            |row| row.get(0),
        )
        .map_err(from_rusqlite)?;

    let status = match expected {
        None if found == 0 => BatchStatus::Missing,
        Some(expected) if expected == found => BatchStatus::Complete,
        expected => BatchStatus::Partial {
            expected: expected.unwrap_or(0) as usize,
            found: found as usize,
        },
    };
    Ok(status)
}

type RawRow = (i64, String, String, String, Option<String>, Option<String>, i64);

/// Run a filtered read, ordered by timestamp then id
pub fn query_changes(conn: &Connection, query: &ChangeQuery) -> Result<Vec<StoredChange>> {
    let mut sql = String::from(
        "SELECT id, run_id, path, change_type, old_permission, new_permission, timestamp
         FROM permission_changes WHERE 1 = 1",
    );
    let mut params: Vec<Value> = Vec::new();

    if let Some(path) = &query.path {
        params.push(Value::Text(path.clone()));
        sql.push_str(&format!(" AND path = ?{}", params.len()));
    }
    if let Some(since) = query.since {
        params.push(Value::Integer(since.timestamp_millis()));
        sql.push_str(&format!(" AND timestamp >= ?{}", params.len()));
    }
    if let Some(until) = query.until {
        params.push(Value::Integer(until.timestamp_millis()));
        sql.push_str(&format!(" AND timestamp <= ?{}", params.len()));
    }
    if let Some(run_id) = &query.run_id {
        params.push(Value::Text(run_id.as_str().to_string()));
        sql.push_str(&format!(" AND run_id = ?{}", params.len()));
    }
    sql.push_str(" ORDER BY timestamp ASC, id ASC");
    if let Some(limit) = query.limit {
        params.push(Value::Integer(limit as i64));
        sql.push_str(&format!(" LIMIT ?{}", params.len()));
    }

    let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
    let rows: Vec<RawRow> = stmt
        .query_map(rusqlite::params_from_iter(params), |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        })
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;

    rows.into_iter().map(decode_row).collect()
}

fn decode_row(row: RawRow) -> Result<StoredChange> {
    let (id, run_id, path, change_type, old, new, timestamp) = row;
    let id_str = id.to_string();

    let kind = ChangeKind::parse(&change_type).ok_or_else(|| {
        corrupt_row(
            "permission_changes",
            &id_str,
            &format!("unknown change_type {}", change_type),
        )
    })?;
    let observed_at = from_millis(timestamp).ok_or_else(|| {
        corrupt_row(
            "permission_changes",
            &id_str,
            &format!("timestamp {} out of range", timestamp),
        )
    })?;
    let record = ChangeRecord::from_parts(
        path,
        kind,
        old.map(PermissionDescriptor::new),
        new.map(PermissionDescriptor::new),
        observed_at,
    )
    .ok_or_else(|| {
        corrupt_row(
            "permission_changes",
            &id_str,
            &format!("descriptors do not fit change_type {}", kind),
        )
    })?;

    Ok(StoredChange {
        id,
        run_id: RunId::from_string(run_id),
        record,
    })
}

/// The changeset stored under `run_id`, in stored order
pub fn stored_changeset(conn: &Connection, run_id: &RunId) -> Result<Changeset> {
    let rows = query_changes(conn, &ChangeQuery::all().for_run(run_id.clone()))?;
    Ok(Changeset::new(rows.into_iter().map(|c| c.record).collect()))
}

pub(crate) fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}
