//! End-to-end runs through the real collaborators built by `from_config`.

#![cfg(unix)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use permtrail_core::change_store::{ChangeQuery, ChangeStore};
use permtrail_core::config::{AlertTransport, AuditConfig};
use permtrail_core::model::{ChangeKind, RunStatus};
use permtrail_core::notify::NotifyResult;
use permtrail_engine::{write_report, AuditOrchestrator, ImmediateTrigger, REPORT_FILE};
use permtrail_store::SqliteChangeStore;
use std::path::Path;
use tempfile::TempDir;

/// A shell "enumeration tool" that adds `b.txt` from its second call on
fn fake_tool_config(dir: &Path) -> AuditConfig {
    let counter = dir.join("calls");
    let script = format!(
        "n=$(cat '{c}' 2>/dev/null || echo 0); n=$((n+1)); echo $n > '{c}'; \
         printf '%s\\tR-X\\n' \"$1/a.txt\"; \
         if [ $n -gt 1 ]; then printf '%s\\tRW-\\n' \"$1/b.txt\"; fi",
        c = counter.display()
    );

    let mut config = AuditConfig::default();
    config.target = "/srv/share".to_string();
    config.output_dir = dir.to_path_buf();
    config.source.program = "sh".to_string();
    config.source.args = vec!["-c".to_string(), script, "fake-accessenum".to_string()];
    config.timeouts.capture_secs = 10;
    config.timeouts.notify_secs = 10;
    config.alert.transport = AlertTransport::Spool;
    config
}

fn eml_files(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".eml"))
            .map(|e| std::fs::read_to_string(e.path()).unwrap())
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[test]
fn test_full_pipeline_with_command_source() {
    let dir = TempDir::new().unwrap();
    let config = fake_tool_config(dir.path());
    let orch = AuditOrchestrator::from_config(&config).unwrap();

    let run = orch.run(&ImmediateTrigger);

    assert_eq!(run.status(), RunStatus::Completed, "{:?}", run.failure());
    assert_eq!(run.changeset().len(), 1);
    let record = &run.changeset().records()[0];
    assert_eq!(record.path(), "/srv/share/b.txt");
    assert_eq!(record.kind(), ChangeKind::Added);

    // Persisted
    let store = SqliteChangeStore::open(config.database_path()).unwrap();
    let stored = store.query(&ChangeQuery::all()).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(&stored[0].run_id, run.run_id());

    // Alerted
    let mails = eml_files(&config.spool_dir());
    assert_eq!(mails.len(), 1);
    assert!(mails[0].contains("To: admin@example.com\r\n"));
    assert!(mails[0].contains("Subject: Unauthorized Permission Changes Detected\r\n"));
    assert!(mails[0].contains("Path: /srv/share/b.txt\r\n"));

    // Archived
    assert!(dir
        .path()
        .join(format!("{}-baseline.txt", run.run_id()))
        .exists());

    // Reported
    let report = write_report(dir.path(), run.changeset()).unwrap();
    assert_eq!(report, dir.path().join(REPORT_FILE));
}

#[test]
fn test_failing_tool_fails_run_without_side_effects() {
    let dir = TempDir::new().unwrap();
    let mut config = fake_tool_config(dir.path());
    config.source.args = vec!["-c".to_string(), "exit 2".to_string()];

    let orch = AuditOrchestrator::from_config(&config).unwrap();
    let run = orch.run(&ImmediateTrigger);

    assert_eq!(run.status(), RunStatus::Failed);
    assert!(run.failure().unwrap().contains("ERR_CAPTURE"));
    assert!(eml_files(&config.spool_dir()).is_empty());
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut config = fake_tool_config(dir.path());
    config.target = String::new();

    assert!(AuditOrchestrator::from_config(&config).is_err());
}

#[test]
fn test_smtp_transport_failure_degrades_run() {
    let dir = TempDir::new().unwrap();
    let mut config = fake_tool_config(dir.path());
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    config.alert.transport = AlertTransport::Smtp;
    config.alert.host = "127.0.0.1".to_string();
    config.alert.port = port;

    let orch = AuditOrchestrator::from_config(&config).unwrap();
    let run = orch.run(&ImmediateTrigger);

    assert_eq!(run.status(), RunStatus::Degraded);
    match run.notify_result() {
        Some(NotifyResult::Failed(reason)) => {
            assert!(reason.contains(&format!("127.0.0.1:{}", port)), "{}", reason)
        }
        other => panic!("expected Failed, got {:?}", other),
    }
    // Stored regardless, and nothing went to the mail drop
    let store = SqliteChangeStore::open(config.database_path()).unwrap();
    assert_eq!(store.query(&ChangeQuery::all()).unwrap().len(), 1);
    assert!(eml_files(&config.spool_dir()).is_empty());
}
