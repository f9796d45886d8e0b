//! Report command
//!
//! Usage: permtrail report [--run <RUN_ID>] [--since <RFC3339>] [--out <DIR>]

use crate::commands::changes::parse_instant;
use crate::config::{self, Overrides};
use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use permtrail_core::change_store::{ChangeQuery, ChangeStore};
use permtrail_core::core_types::RunId;
use permtrail_core::model::Changeset;
use permtrail_engine::write_report;
use permtrail_store::SqliteChangeStore;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Report one run's changes instead of the whole history
    #[arg(long = "run")]
    pub run_id: Option<String>,

    /// Only changes observed at or after this instant (RFC 3339)
    #[arg(long, value_parser = parse_instant)]
    pub since: Option<DateTime<Utc>>,

    /// Directory for the report (default: the configured output directory)
    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

pub fn execute(config_path: &Path, args: ReportArgs) -> Result<i32> {
    let config = config::resolve(
        config_path,
        &Overrides {
            target: None,
            output_dir: args.output_dir.clone(),
        },
    )?;
    let store = SqliteChangeStore::open_existing(config.database_path())?;

    let changeset = match (&args.run_id, args.since) {
        (Some(run_id), None) => store.changeset_for_run(&RunId::from(run_id.as_str()))?,
        (run_id, since) => {
            let mut query = ChangeQuery::all();
            if let Some(run_id) = run_id {
                query = query.for_run(RunId::from(run_id.as_str()));
            }
            if let Some(since) = since {
                query = query.since(since);
            }
            Changeset::new(store.query(&query)?.into_iter().map(|c| c.record).collect())
        }
    };

    let dir = args.out.unwrap_or_else(|| config.output_dir.clone());
    let path = write_report(&dir, &changeset)?;
    println!("✓ Rendered {} change(s) to {}", changeset.len(), path.display());
    Ok(0)
}
