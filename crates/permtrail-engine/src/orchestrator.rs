//! Audit run orchestration.
//!
//! ## Pipeline (in order):
//! 1. Capture and parse the baseline (fatal on error)
//! 2. Wait for the trigger, bounded by the trigger timeout (fatal on error)
//! 3. Capture and parse the current state (fatal on error)
//! 4. Diff; an empty changeset completes the run with no store or notify call
//! 5. Append to the change store (failure degrades the run)
//! 6. Notify (failure degrades the run)
//! 7. Record the terminal run in the run ledger (best effort)
//!
//! The orchestrator holds only shared collaborators and an immutable config,
//! so one instance can drive several runs on separate threads at once.

#![allow(clippy::result_large_err)]

use crate::fs::atomic_write;
use crate::sink::SpoolAlertSink;
use crate::smtp::SmtpAlertSink;
use crate::source::CommandPermissionSource;
use permtrail_core::change_store::{AppendOutcome, ChangeStore};
use permtrail_core::config::{AlertTransport, AuditConfig};
use permtrail_core::diff::compute_diff;
use permtrail_core::errors::ExError;
use permtrail_core::model::{AuditRun, PersistOutcome, RunStage, Snapshot};
use permtrail_core::notify::{AlertSink, Notifier, NotifyResult};
use permtrail_core::snapshot::{parse, snapshot_ref};
use permtrail_core::source::{PermissionSource, Trigger};
use permtrail_core::{log_op_end, log_op_error, log_op_start};
use permtrail_core_types::RunId;
use permtrail_store::SqliteChangeStore;
use std::sync::Arc;
use std::time::Instant;

const OP_AUDIT_RUN: &str = "audit_run";

/// Which of the two captures of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureSide {
    Baseline,
    Current,
}

impl CaptureSide {
    fn as_str(self) -> &'static str {
        match self {
            CaptureSide::Baseline => "baseline",
            CaptureSide::Current => "current",
        }
    }
}

pub struct AuditOrchestrator {
    config: AuditConfig,
    source: Arc<dyn PermissionSource>,
    store: Arc<dyn ChangeStore>,
    notifier: Notifier,
}

impl AuditOrchestrator {
    pub fn new(
        config: AuditConfig,
        source: Arc<dyn PermissionSource>,
        store: Arc<dyn ChangeStore>,
        notifier: Notifier,
    ) -> Self {
        Self {
            config,
            source,
            store,
            notifier,
        }
    }

    /// Wire the standard collaborators: the configured enumeration tool, the
    /// SQLite store at `database_path()` and the alert sink named by
    /// `alert.transport` (SMTP relay or mail drop).
    ///
    /// # Errors
    ///
    /// - `ExErrorKind::InvalidInput` if the config does not validate
    /// - `ExErrorKind::Persistence` / `Io` if the database cannot be opened
    pub fn from_config(config: &AuditConfig) -> Result<Self, ExError> {
        config.validate()?;

        let store = SqliteChangeStore::open(config.database_path())?;
        let sink: Arc<dyn AlertSink> = match config.alert.transport {
            AlertTransport::Smtp => Arc::new(
                SmtpAlertSink::new(
                    config.alert.host.clone(),
                    config.alert.port,
                    config.alert.sender.clone(),
                )
                .with_timeout(config.notify_timeout()),
            ),
            AlertTransport::Spool => Arc::new(SpoolAlertSink::new(
                config.spool_dir(),
                config.alert.sender.clone(),
            )),
        };
        let notifier = Notifier::new(sink, config.alert.recipient.clone())
            .with_subject(config.alert.subject.clone())
            .with_dispatch_timeout(config.notify_timeout());

        Ok(Self::new(
            config.clone(),
            Arc::new(CommandPermissionSource::from_config(config)),
            Arc::new(store),
            notifier,
        ))
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Execute one audit run under a fresh run id
    pub fn run(&self, trigger: &dyn Trigger) -> AuditRun {
        self.run_with_id(RunId::new(), trigger)
    }

    /// Execute one audit run.
    ///
    /// Always returns a terminal run. Capture, parse and trigger failures end
    /// it `Failed`; store and notify failures end it `Degraded`. Reusing the
    /// run id of an earlier run is a `Duplicate` when the changes match the
    /// stored ones and a store failure when they differ.
    pub fn run_with_id(&self, run_id: RunId, trigger: &dyn Trigger) -> AuditRun {
        let started = Instant::now();
        let mut run = AuditRun::new(run_id, self.config.target.clone());

        log_op_start!(
            OP_AUDIT_RUN,
            run_id = %run.run_id(),
            audit_target = %run.target()
        );

        match self.drive(&mut run, trigger) {
            Ok(()) => {
                log_op_end!(
                    OP_AUDIT_RUN,
                    duration_ms = started.elapsed().as_millis() as u64,
                    run_id = %run.run_id(),
                    status = %run.status(),
                    change_count = run.changeset().len()
                );
            }
            Err(err) => {
                let reason = err.to_string();
                let run_id = run.run_id().clone();
                if let Err(e) = run.fail(reason) {
                    tracing::error!(run_id = %run_id, stage = %run.stage(), error = %e, "Could not mark run failed");
                }
                log_op_error!(
                    OP_AUDIT_RUN,
                    err,
                    duration_ms = started.elapsed().as_millis() as u64,
                    run_id = %run_id
                );
            }
        }

        if let Err(e) = self.store.record_run(&run) {
            tracing::warn!(run_id = %run.run_id(), error = %e, "Failed to record audit run");
        }
        run
    }

    fn drive(&self, run: &mut AuditRun, trigger: &dyn Trigger) -> Result<(), ExError> {
        enter(run, RunStage::CapturingBaseline)?;
        let baseline = self.capture(run, CaptureSide::Baseline)?;

        enter(run, RunStage::AwaitingTrigger)?;
        trigger
            .wait(self.config.trigger_timeout())
            .map_err(|e| e.with_run_id(run.run_id().clone()))?;

        enter(run, RunStage::CapturingCurrent)?;
        let current = self.capture(run, CaptureSide::Current)?;

        enter(run, RunStage::Diffing)?;
        let changeset = compute_diff(
            &baseline,
            &current,
            run.stamp(),
            &self.config.diff_options(),
        );
        tracing::debug!(run_id = %run.run_id(), change_count = changeset.len(), "Diff computed");
        run.attach_changeset(changeset)?;

        if run.changeset().is_empty() {
            enter(run, RunStage::NoChange)?;
            run.complete()?;
            return Ok(());
        }

        enter(run, RunStage::Persisting)?;
        let persisted = self.persist(run);
        run.record_persist(persisted)?;

        enter(run, RunStage::Notifying)?;
        let notified = self.notifier.notify(run.changeset());
        if let NotifyResult::Failed(reason) = &notified {
            tracing::warn!(run_id = %run.run_id(), reason = %reason, "Alert dispatch failed");
        }
        run.record_notify(notified)?;

        run.complete()?;
        Ok(())
    }

    /// Capture, archive and parse one side of the run
    fn capture(&self, run: &mut AuditRun, side: CaptureSide) -> Result<Snapshot, ExError> {
        let raw = self
            .source
            .capture(run.target())
            .map_err(|e| e.with_run_id(run.run_id().clone()))?;

        self.archive(run.run_id(), side, &raw);

        let parsed = parse(&raw, &self.config.line_format)
            .map_err(|e| ExError::from(e).with_run_id(run.run_id().clone()))?;
        if parsed.stats.skipped > 0 {
            tracing::warn!(
                run_id = %run.run_id(),
                capture = side.as_str(),
                skipped_lines = parsed.stats.skipped,
                "Skipped unrecognized capture lines"
            );
        }
        tracing::debug!(
            run_id = %run.run_id(),
            capture = side.as_str(),
            entry_count = parsed.snapshot.len(),
            duplicates = parsed.stats.duplicates,
            "Capture parsed"
        );

        let reference = snapshot_ref(&raw, &parsed);
        match side {
            CaptureSide::Baseline => run.attach_baseline(reference)?,
            CaptureSide::Current => run.attach_current(reference)?,
        }
        Ok(parsed.snapshot)
    }

    fn archive(&self, run_id: &RunId, side: CaptureSide, raw: &[u8]) {
        let Some(dir) = self.config.archive_dir() else {
            return;
        };
        let path = dir.join(format!("{}-{}.txt", run_id, side.as_str()));
        if let Err(e) = atomic_write(&path, raw) {
            tracing::warn!(run_id = %run_id, path = %path.display(), error = %e, "Failed to archive capture");
        }
    }

    fn persist(&self, run: &AuditRun) -> PersistOutcome {
        match self.store.append(run.run_id(), run.changeset()) {
            Ok(AppendOutcome::Appended { rows }) => PersistOutcome::Appended { rows },
            Ok(AppendOutcome::Duplicate) => {
                tracing::info!(run_id = %run.run_id(), "Changeset already recorded for this run");
                PersistOutcome::Duplicate
            }
            // Not reachable with a non-empty changeset; nothing was written.
            Ok(AppendOutcome::Empty) => PersistOutcome::Appended { rows: 0 },
            Err(e) => {
                tracing::error!(
                    run_id = %run.run_id(),
                    err.code = e.code(),
                    error = %e,
                    "Failed to persist changeset"
                );
                PersistOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

fn enter(run: &mut AuditRun, next: RunStage) -> Result<(), ExError> {
    let from = run.stage();
    run.advance(next)?;
    tracing::debug!(run_id = %run.run_id(), from = %from, stage = %next, "Stage transition");
    Ok(())
}

impl std::fmt::Debug for AuditOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditOrchestrator")
            .field("target", &self.config.target)
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}
