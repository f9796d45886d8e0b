//! Run command
//!
//! Usage: permtrail run [--target <DIR>] [--no-prompt | --wait-secs <N>]

use crate::commands::EXIT_DEGRADED;
use crate::config::{self, Overrides};
use crate::prompt::PromptTrigger;
use anyhow::Result;
use clap::Args;
use permtrail_core::core_types::RunId;
use permtrail_core::model::{AuditRun, PersistOutcome, RunStatus};
use permtrail_core::notify::NotifyResult;
use permtrail_core::source::Trigger;
use permtrail_engine::{write_report, AuditOrchestrator, DelayTrigger, ImmediateTrigger};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Directory tree to audit (overrides the config file)
    #[arg(long)]
    pub target: Option<String>,

    /// Where the database, report, captures and mail drop go
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Capture the second snapshot right after the first
    #[arg(long, conflicts_with = "wait_secs")]
    pub no_prompt: bool,

    /// Capture the second snapshot after this many seconds instead of prompting
    #[arg(long)]
    pub wait_secs: Option<u64>,

    /// Run identifier; reusing one whose changes are stored records nothing new
    #[arg(long)]
    pub run_id: Option<String>,

    /// Do not write the HTML report
    #[arg(long)]
    pub no_report: bool,
}

impl RunArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            target: self.target.clone(),
            output_dir: self.output_dir.clone(),
        }
    }
}

pub fn execute(config_path: &Path, args: RunArgs) -> Result<i32> {
    let config = config::resolve(config_path, &args.overrides())?;
    let orchestrator = AuditOrchestrator::from_config(&config)?;

    let trigger: Box<dyn Trigger> = if args.no_prompt {
        Box::new(ImmediateTrigger)
    } else if let Some(secs) = args.wait_secs {
        Box::new(DelayTrigger::new(Duration::from_secs(secs)))
    } else {
        Box::new(PromptTrigger::stdin())
    };

    let run = match &args.run_id {
        Some(id) => orchestrator.run_with_id(RunId::from(id.as_str()), trigger.as_ref()),
        None => orchestrator.run(trigger.as_ref()),
    };

    if run.status() == RunStatus::Failed {
        eprintln!(
            "Audit run {} failed: {}",
            run.run_id(),
            run.failure().unwrap_or("unknown error")
        );
        return Ok(1);
    }

    if run.changeset().is_empty() {
        println!("No changes detected.");
        return Ok(0);
    }

    let mut degraded = run.status() == RunStatus::Degraded;
    let report = if args.no_report {
        None
    } else {
        match write_report(&config.output_dir, run.changeset()) {
            Ok(path) => Some(path),
            Err(e) => {
                eprintln!("Report could not be written: {}", e);
                degraded = true;
                None
            }
        }
    };

    if !degraded && report.is_some() {
        println!("Unauthorized changes detected. Report generated and alert sent.");
    } else {
        print_outcome(&run);
    }
    if let Some(PersistOutcome::Duplicate) = run.persist_outcome() {
        println!("Changes for this run were already stored.");
    }
    println!("Run: {}", run.run_id());
    println!("Changes: {}", run.changeset().len());
    if let Some(path) = report {
        println!("Report: {}", path.display());
    }

    Ok(if degraded { EXIT_DEGRADED } else { 0 })
}

fn print_outcome(run: &AuditRun) {
    println!("Unauthorized changes detected.");
    if let Some(PersistOutcome::Failed { reason }) = run.persist_outcome() {
        eprintln!("Changes were not stored: {}", reason);
    }
    match run.notify_result() {
        Some(NotifyResult::Sent) => println!("Alert sent."),
        Some(NotifyResult::Failed(reason)) => eprintln!("Alert failed: {}", reason),
        _ => {}
    }
}
