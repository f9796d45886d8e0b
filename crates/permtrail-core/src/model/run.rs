//! Audit run record and its stage machine.
//!
//! ```text
//! Idle → CapturingBaseline → AwaitingTrigger → CapturingCurrent → Diffing
//!      Diffing → NoChange → Completed
//!      Diffing → Persisting → Notifying → Completed
//! CapturingBaseline | AwaitingTrigger | CapturingCurrent → Failed
//! ```
//!
//! `Completed` and `Failed` are terminal. A run that reached `Completed`
//! after a store or notify failure carries status `Degraded`.

use crate::errors::{AuditError, Result};
use crate::model::change::Changeset;
use crate::notify::NotifyResult;
use chrono::{DateTime, SubsecRound, Utc};
use permtrail_core_types::RunId;
use serde::{Deserialize, Serialize};

/// Position of an audit run in its stage machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunStage {
    Idle,
    CapturingBaseline,
    AwaitingTrigger,
    CapturingCurrent,
    Diffing,
    NoChange,
    Persisting,
    Notifying,
    Completed,
    Failed,
}

impl RunStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStage::Idle => "idle",
            RunStage::CapturingBaseline => "capturing_baseline",
            RunStage::AwaitingTrigger => "awaiting_trigger",
            RunStage::CapturingCurrent => "capturing_current",
            RunStage::Diffing => "diffing",
            RunStage::NoChange => "no_change",
            RunStage::Persisting => "persisting",
            RunStage::Notifying => "notifying",
            RunStage::Completed => "completed",
            RunStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStage::Completed | RunStage::Failed)
    }

    /// Whether the machine has an edge from `self` to `next`
    pub fn can_advance_to(&self, next: RunStage) -> bool {
        use RunStage::*;
        matches!(
            (self, next),
            (Idle, CapturingBaseline)
                | (CapturingBaseline, AwaitingTrigger)
                | (AwaitingTrigger, CapturingCurrent)
                | (CapturingCurrent, Diffing)
                | (Diffing, NoChange)
                | (Diffing, Persisting)
                | (Persisting, Notifying)
                | (NoChange, Completed)
                | (Notifying, Completed)
                | (CapturingBaseline, Failed)
                | (AwaitingTrigger, Failed)
                | (CapturingCurrent, Failed)
        )
    }
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall outcome of an audit run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Completed,
    /// Completed, but the store append or the alert dispatch failed
    Degraded,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Degraded => "degraded",
            RunStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to one parsed capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRef {
    /// SHA-256 of the raw capture bytes, hex-encoded
    pub digest: String,
    /// Entries in the normalized snapshot
    pub entries: usize,
    /// Non-blank lines that were not entries
    pub skipped: usize,
    /// Paths listed more than once
    pub duplicates: usize,
}

/// What happened when the run tried to persist its changeset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistOutcome {
    Appended { rows: usize },
    /// The store already held this run's changeset
    Duplicate,
    Failed { reason: String },
}

impl PersistOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersistOutcome::Appended { .. } => "appended",
            PersistOutcome::Duplicate => "duplicate",
            PersistOutcome::Failed { .. } => "failed",
        }
    }
}

/// Record of one audit cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRun {
    run_id: RunId,
    target: String,
    stage: RunStage,
    status: RunStatus,
    baseline: Option<SnapshotRef>,
    current: Option<SnapshotRef>,
    changeset: Changeset,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    persist_outcome: Option<PersistOutcome>,
    notify_result: Option<NotifyResult>,
    failure: Option<String>,
    failed_at: Option<RunStage>,
    degradations: Vec<String>,
}

impl AuditRun {
    /// Create a run in `Idle`, stamped with the current time
    ///
    /// The start time is kept at millisecond precision, the precision the
    /// store persists, so stored records never sort before their run.
    pub fn new(run_id: RunId, target: impl Into<String>) -> Self {
        Self {
            run_id,
            target: target.into(),
            stage: RunStage::Idle,
            status: RunStatus::Running,
            baseline: None,
            current: None,
            changeset: Changeset::empty(),
            started_at: Utc::now().trunc_subsecs(3),
            completed_at: None,
            persist_outcome: None,
            notify_result: None,
            failure: None,
            failed_at: None,
            degradations: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn baseline(&self) -> Option<&SnapshotRef> {
        self.baseline.as_ref()
    }

    pub fn current(&self) -> Option<&SnapshotRef> {
        self.current.as_ref()
    }

    pub fn changeset(&self) -> &Changeset {
        &self.changeset
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn persist_outcome(&self) -> Option<&PersistOutcome> {
        self.persist_outcome.as_ref()
    }

    pub fn notify_result(&self) -> Option<&NotifyResult> {
        self.notify_result.as_ref()
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Stage the run was in when it failed
    pub fn failed_at(&self) -> Option<RunStage> {
        self.failed_at
    }

    /// Reasons the run finished `Degraded`, in the order they occurred
    pub fn degradations(&self) -> &[String] {
        &self.degradations
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `next`, if the stage machine allows it
    ///
    /// # Errors
    ///
    /// - `RunFinalized` if the run is already terminal
    /// - `IllegalTransition` if there is no edge from the current stage
    pub fn advance(&mut self, next: RunStage) -> Result<()> {
        self.ensure_open(next)?;
        if !self.stage.can_advance_to(next) {
            return Err(AuditError::IllegalTransition {
                run_id: self.run_id.to_string(),
                from: self.stage.to_string(),
                to: next.to_string(),
            });
        }
        self.stage = next;
        Ok(())
    }

    /// Attach the parsed baseline capture
    ///
    /// # Errors
    ///
    /// `RunFinalized` if the run is already terminal
    pub fn attach_baseline(&mut self, snapshot: SnapshotRef) -> Result<()> {
        self.ensure_open(self.stage)?;
        self.baseline = Some(snapshot);
        Ok(())
    }

    /// Attach the parsed current capture
    ///
    /// # Errors
    ///
    /// `RunFinalized` if the run is already terminal
    pub fn attach_current(&mut self, snapshot: SnapshotRef) -> Result<()> {
        self.ensure_open(self.stage)?;
        self.current = Some(snapshot);
        Ok(())
    }

    /// Attach the diff result
    ///
    /// # Errors
    ///
    /// `RunFinalized` if the run is already terminal
    pub fn attach_changeset(&mut self, changeset: Changeset) -> Result<()> {
        self.ensure_open(self.stage)?;
        self.changeset = changeset;
        Ok(())
    }

    /// Record the store outcome; a failed append degrades the run
    ///
    /// # Errors
    ///
    /// `RunFinalized` if the run is already terminal
    pub fn record_persist(&mut self, outcome: PersistOutcome) -> Result<()> {
        self.ensure_open(self.stage)?;
        if let PersistOutcome::Failed { reason } = &outcome {
            self.degradations.push(format!("store: {}", reason));
        }
        self.persist_outcome = Some(outcome);
        Ok(())
    }

    /// Record the notification outcome; a failed dispatch degrades the run
    ///
    /// # Errors
    ///
    /// `RunFinalized` if the run is already terminal
    pub fn record_notify(&mut self, result: NotifyResult) -> Result<()> {
        self.ensure_open(self.stage)?;
        if let NotifyResult::Failed(reason) = &result {
            self.degradations.push(format!("notify: {}", reason));
        }
        self.notify_result = Some(result);
        Ok(())
    }

    /// Move to `Completed`; status becomes `Degraded` if anything degraded
    ///
    /// # Errors
    ///
    /// Same as [`AuditRun::advance`]
    pub fn complete(&mut self) -> Result<()> {
        self.advance(RunStage::Completed)?;
        self.status = if self.degradations.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::Degraded
        };
        self.completed_at = Some(self.stamp());
        Ok(())
    }

    /// Move to `Failed` with the given reason
    ///
    /// # Errors
    ///
    /// Same as [`AuditRun::advance`]
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        let failed_at = self.stage;
        self.advance(RunStage::Failed)?;
        self.failed_at = Some(failed_at);
        self.status = RunStatus::Failed;
        self.failure = Some(reason.into());
        self.completed_at = Some(self.stamp());
        Ok(())
    }

    /// Current time at millisecond precision, never earlier than `started_at`
    ///
    /// Change records are stamped with this so that every persisted record
    /// is ordered after the start of the run that observed it.
    pub fn stamp(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(3).max(self.started_at)
    }

    fn ensure_open(&self, next: RunStage) -> Result<()> {
        if self.is_terminal() {
            return Err(AuditError::RunFinalized {
                run_id: self.run_id.to_string(),
                status: self.status.to_string(),
                stage: next.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_time_has_millisecond_precision() {
        let run = AuditRun::new(RunId::from("r-ms"), "/data");
        assert_eq!(run.started_at().timestamp_subsec_nanos() % 1_000_000, 0);
        let stamp = run.stamp();
        assert_eq!(stamp.timestamp_subsec_nanos() % 1_000_000, 0);
        assert!(stamp >= run.started_at());
    }

    fn run_to_diffing() -> AuditRun {
        let mut run = AuditRun::new(RunId::from("r1"), "/data");
        for stage in [
            RunStage::CapturingBaseline,
            RunStage::AwaitingTrigger,
            RunStage::CapturingCurrent,
            RunStage::Diffing,
        ] {
            run.advance(stage).unwrap();
        }
        run
    }

    #[test]
    fn test_new_run_is_idle_and_running() {
        let run = AuditRun::new(RunId::new(), "/data");
        assert_eq!(run.stage(), RunStage::Idle);
        assert_eq!(run.status(), RunStatus::Running);
        assert!(run.completed_at().is_none());
    }

    #[test]
    fn test_no_change_path_completes_cleanly() {
        let mut run = run_to_diffing();
        run.advance(RunStage::NoChange).unwrap();
        run.complete().unwrap();

        assert_eq!(run.stage(), RunStage::Completed);
        assert_eq!(run.status(), RunStatus::Completed);
        assert!(run.completed_at().unwrap() >= run.started_at());
    }

    #[test]
    fn test_skipping_a_stage_is_rejected() {
        let mut run = AuditRun::new(RunId::new(), "/data");
        let err = run.advance(RunStage::Diffing).unwrap_err();
        assert!(matches!(err, AuditError::IllegalTransition { .. }));
        assert_eq!(run.stage(), RunStage::Idle);
    }

    #[test]
    fn test_diffing_cannot_fail() {
        let mut run = run_to_diffing();
        assert!(run.fail("boom").is_err());
    }

    #[test]
    fn test_store_failure_degrades() {
        let mut run = run_to_diffing();
        run.advance(RunStage::Persisting).unwrap();
        run.record_persist(PersistOutcome::Failed {
            reason: "disk full".into(),
        })
        .unwrap();
        run.advance(RunStage::Notifying).unwrap();
        run.record_notify(NotifyResult::Sent).unwrap();
        run.complete().unwrap();

        assert_eq!(run.status(), RunStatus::Degraded);
        assert_eq!(run.degradations(), ["store: disk full".to_string()]);
    }

    #[test]
    fn test_terminal_run_is_immutable() {
        let mut run = AuditRun::new(RunId::from("r9"), "/data");
        run.advance(RunStage::CapturingBaseline).unwrap();
        run.fail("source missing").unwrap();

        assert_eq!(run.status(), RunStatus::Failed);
        assert_eq!(run.failure(), Some("source missing"));
        assert_eq!(run.failed_at(), Some(RunStage::CapturingBaseline));

        let err = run.attach_changeset(Changeset::empty()).unwrap_err();
        assert!(matches!(err, AuditError::RunFinalized { .. }));
        assert!(run.record_notify(NotifyResult::Sent).is_err());
        assert!(run.fail("again").is_err());
    }

    #[test]
    fn test_stamp_never_precedes_start() {
        let run = AuditRun::new(RunId::new(), "/data");
        assert!(run.stamp() >= run.started_at());
    }
}
