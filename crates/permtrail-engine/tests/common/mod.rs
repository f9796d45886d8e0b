//! Shared fakes for orchestrator tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use permtrail_core::change_store::{
    AppendOutcome, BatchStatus, ChangeQuery, ChangeStore, StoredChange,
};
use permtrail_core::config::AuditConfig;
use permtrail_core::errors::{AuditError, ExError, ExErrorKind};
use permtrail_core::model::{AuditRun, Changeset};
use permtrail_core::notify::{AlertSink, Notifier};
use permtrail_core::source::{PermissionSource, Trigger};
use permtrail_core_types::RunId;
use permtrail_engine::AuditOrchestrator;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Returns queued captures in order; an exhausted queue is a capture error
#[derive(Default)]
pub struct ScriptedSource {
    outputs: Mutex<VecDeque<Result<Vec<u8>, ExError>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(outputs: Vec<Result<Vec<u8>, ExError>>) -> Self {
        Self {
            outputs: Mutex::new(outputs.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn texts(baseline: &str, current: &str) -> Self {
        Self::new(vec![
            Ok(baseline.as_bytes().to_vec()),
            Ok(current.as_bytes().to_vec()),
        ])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PermissionSource for ScriptedSource {
    fn capture(&self, target: &str) -> Result<Vec<u8>, ExError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outputs
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(AuditError::SourceUnavailable {
                    target: target.to_string(),
                    reason: "no scripted output left".to_string(),
                }
                .into())
            })
    }
}

/// In-memory store that records every call
#[derive(Default)]
pub struct RecordingStore {
    pub appends: Mutex<Vec<(RunId, Changeset)>>,
    pub runs: Mutex<Vec<AuditRun>>,
}

impl RecordingStore {
    pub fn append_count(&self) -> usize {
        self.appends.lock().unwrap().len()
    }

    pub fn recorded_runs(&self) -> Vec<AuditRun> {
        self.runs.lock().unwrap().clone()
    }
}

impl ChangeStore for RecordingStore {
    fn append(&self, run_id: &RunId, changeset: &Changeset) -> Result<AppendOutcome, ExError> {
        if changeset.is_empty() {
            return Ok(AppendOutcome::Empty);
        }
        self.appends
            .lock()
            .unwrap()
            .push((run_id.clone(), changeset.clone()));
        Ok(AppendOutcome::Appended {
            rows: changeset.len(),
        })
    }

    fn query(&self, _query: &ChangeQuery) -> Result<Vec<StoredChange>, ExError> {
        Ok(Vec::new())
    }

    fn batch_status(&self, _run_id: &RunId) -> Result<BatchStatus, ExError> {
        Ok(BatchStatus::Missing)
    }

    fn record_run(&self, run: &AuditRun) -> Result<(), ExError> {
        self.runs.lock().unwrap().push(run.clone());
        Ok(())
    }
}

/// Store whose appends always fail
#[derive(Default)]
pub struct FailingStore {
    pub attempts: AtomicUsize,
    pub runs: Mutex<Vec<AuditRun>>,
}

impl ChangeStore for FailingStore {
    fn append(&self, _run_id: &RunId, _changeset: &Changeset) -> Result<AppendOutcome, ExError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ExError::new(ExErrorKind::Persistence)
            .with_op("append")
            .with_message("database is locked"))
    }

    fn query(&self, _query: &ChangeQuery) -> Result<Vec<StoredChange>, ExError> {
        Ok(Vec::new())
    }

    fn batch_status(&self, _run_id: &RunId) -> Result<BatchStatus, ExError> {
        Ok(BatchStatus::Missing)
    }

    fn record_run(&self, run: &AuditRun) -> Result<(), ExError> {
        self.runs.lock().unwrap().push(run.clone());
        Ok(())
    }
}

/// Sink that records messages, or rejects them when `fail` is set
#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<(String, String, String)>>,
    pub fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn messages(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl AlertSink for RecordingSink {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), ExError> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.into(), subject.into(), body.into()));
        if self.fail {
            return Err(AuditError::SinkRejected {
                recipient: recipient.to_string(),
                reason: "connection refused".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Trigger that counts waits and then fires immediately
#[derive(Default)]
pub struct CountingTrigger {
    pub waits: AtomicUsize,
}

impl Trigger for CountingTrigger {
    fn wait(&self, _timeout: Option<Duration>) -> Result<(), ExError> {
        self.waits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Config for fake-backed runs: no archiving, unix separators
pub fn test_config() -> AuditConfig {
    let mut config = AuditConfig::default();
    config.target = "/data".to_string();
    config.archive_captures = false;
    config
}

pub fn orchestrator(
    config: AuditConfig,
    source: Arc<dyn PermissionSource>,
    store: Arc<dyn ChangeStore>,
    sink: Arc<dyn AlertSink>,
) -> AuditOrchestrator {
    let notifier = Notifier::new(sink, "admin@example.com");
    AuditOrchestrator::new(config, source, store, notifier)
}
