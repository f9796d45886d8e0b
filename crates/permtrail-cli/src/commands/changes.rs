//! Changes command
//!
//! Usage: permtrail changes [--path <PATH>] [--run <RUN_ID>] [--since <RFC3339>] [--json]

use crate::config::{self, Overrides};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use permtrail_core::change_store::{ChangeQuery, ChangeStore, StoredChange};
use permtrail_core::core_types::RunId;
use permtrail_store::SqliteChangeStore;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct ChangesArgs {
    /// Only changes to this exact path
    #[arg(long)]
    pub path: Option<String>,

    /// Only changes recorded by this run
    #[arg(long = "run")]
    pub run_id: Option<String>,

    /// Only changes observed at or after this instant (RFC 3339)
    #[arg(long, value_parser = parse_instant)]
    pub since: Option<DateTime<Utc>>,

    /// Only changes observed at or before this instant (RFC 3339)
    #[arg(long, value_parser = parse_instant)]
    pub until: Option<DateTime<Utc>>,

    /// At most this many rows
    #[arg(long)]
    pub limit: Option<usize>,

    /// Print JSON lines instead of a table
    #[arg(long)]
    pub json: bool,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

pub(crate) fn parse_instant(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {}", e))
}

impl ChangesArgs {
    fn query(&self) -> ChangeQuery {
        let mut query = ChangeQuery::all();
        if let Some(path) = &self.path {
            query = query.for_path(path.clone());
        }
        if let Some(run_id) = &self.run_id {
            query = query.for_run(RunId::from(run_id.as_str()));
        }
        if let Some(since) = self.since {
            query = query.since(since);
        }
        if let Some(until) = self.until {
            query = query.until(until);
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        query
    }
}

pub fn execute(config_path: &Path, args: ChangesArgs) -> Result<i32> {
    let config = config::resolve(
        config_path,
        &Overrides {
            target: None,
            output_dir: args.output_dir.clone(),
        },
    )?;
    let store = SqliteChangeStore::open_existing(config.database_path())?;
    let rows = store.query(&args.query())?;

    if args.json {
        for row in &rows {
            println!(
                "{}",
                serde_json::to_string(row).context("failed to serialize change")?
            );
        }
    } else if rows.is_empty() {
        println!("No recorded changes.");
    } else {
        for row in &rows {
            println!("{}", format_row(row));
        }
    }
    Ok(0)
}

fn format_row(row: &StoredChange) -> String {
    let record = &row.record;
    format!(
        "{}  {:<8}  {} -> {}  {}  (run {})",
        record.observed_at().to_rfc3339(),
        record.kind().as_str(),
        record.previous().map_or("None", |d| d.as_str()),
        record.current().map_or("None", |d| d.as_str()),
        record.path(),
        row.run_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use permtrail_core::model::ChangeRecord;

    #[test]
    fn test_parse_instant() {
        let t = parse_instant("2024-03-01T12:00:00+02:00").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
        assert!(parse_instant("yesterday").is_err());
    }

    #[test]
    fn test_format_row() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let row = StoredChange {
            id: 7,
            run_id: RunId::from("r-1"),
            record: ChangeRecord::modified("/data/a.txt", "R-X".into(), "RWX".into(), at),
        };
        assert_eq!(
            format_row(&row),
            "2024-03-01T10:00:00+00:00  Modified  R-X -> RWX  /data/a.txt  (run r-1)"
        );
    }
}
