//! CLI integration tests
//!
//! Drive the `permtrail` binary end to end with a shell script standing in
//! for the permission enumeration tool.

#![cfg(unix)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Every even-numbered call (the second capture of each run) adds `b.txt`
const GROWING_TOOL: &str = r#"
n=$(cat "$(dirname "$0")/calls" 2>/dev/null || echo 0)
n=$((n+1))
echo $n > "$(dirname "$0")/calls"
printf '%s\tR-X\n' "$1/a.txt"
if [ $((n % 2)) -eq 0 ]; then printf '%s\tRW-\n' "$1/b.txt"; fi
"#;

const STATIC_TOOL: &str = r#"
printf '%s\tR-X\n' "$1/a.txt"
"#;

/// Write the fake tool and a config file pointing at it; returns the config path
fn setup(dir: &TempDir, tool: &str) -> PathBuf {
    let script = dir.path().join("tool.sh");
    std::fs::write(&script, tool).unwrap();

    let config = dir.path().join("permtrail.toml");
    std::fs::write(
        &config,
        format!(
            "target = '/srv/share'\n\
             output_dir = '{out}'\n\
             \n\
             [source]\n\
             program = 'sh'\n\
             args = ['{script}']\n\
             \n\
             [alert]\n\
             transport = 'spool'\n\
             \n\
             [timeouts]\n\
             capture_secs = 10\n\
             trigger_secs = 10\n",
            out = dir.path().display(),
            script = script.display()
        ),
    )
    .unwrap();
    config
}

fn permtrail(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_permtrail"))
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_run_detects_change_and_writes_artifacts() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir, GROWING_TOOL);

    let output = permtrail(&config, &["run", "--no-prompt", "--run-id", "cli-run-1"]);

    assert!(
        output.status.success(),
        "Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let out = stdout(&output);
    assert!(out.contains("Unauthorized changes detected. Report generated and alert sent."));
    assert!(out.contains("Run: cli-run-1"));
    assert!(out.contains("Changes: 1"));

    assert!(dir.path().join("permissions.db").exists());
    assert!(dir.path().join("permission_changes_report.html").exists());
    assert!(dir.path().join("cli-run-1-baseline.txt").exists());
    assert!(dir.path().join("cli-run-1-current.txt").exists());
    let spooled = std::fs::read_dir(dir.path().join("outbox")).unwrap().count();
    assert_eq!(spooled, 1);

    let report = std::fs::read_to_string(dir.path().join("permission_changes_report.html")).unwrap();
    assert!(report.contains("/srv/share/b.txt"));
}

#[test]
fn test_run_without_changes() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir, STATIC_TOOL);

    let output = permtrail(&config, &["run", "--no-prompt"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("No changes detected."));
    assert!(!dir.path().join("permission_changes_report.html").exists());
    assert!(!dir.path().join("outbox").exists());
}

#[test]
fn test_run_waits_for_enter() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir, GROWING_TOOL);

    let mut child = Command::new(env!("CARGO_BIN_EXE_permtrail"))
        .arg("--config")
        .arg(&config)
        .args(["run", "--no-report"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(b"\n").unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("press Enter"));
    assert!(stdout(&output).contains("Changes: 1"));
    assert!(!dir.path().join("permission_changes_report.html").exists());
}

#[test]
fn test_closed_stdin_fails_run() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir, GROWING_TOOL);

    let output = Command::new(env!("CARGO_BIN_EXE_permtrail"))
        .arg("--config")
        .arg(&config)
        .arg("run")
        .stdin(Stdio::null())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERR_CANCELLED"), "Stderr: {}", stderr);
}

#[test]
fn test_failing_tool_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir, "exit 3\n");

    let output = permtrail(&config, &["run", "--no-prompt"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERR_CAPTURE"));
}

#[test]
fn test_changes_lists_stored_rows() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir, GROWING_TOOL);
    assert!(permtrail(&config, &["run", "--no-prompt", "--run-id", "r-list"])
        .status
        .success());

    let table = permtrail(&config, &["changes"]);
    assert!(table.status.success());
    let out = stdout(&table);
    assert!(out.contains("Added"));
    assert!(out.contains("None -> RW-"));
    assert!(out.contains("/srv/share/b.txt"));
    assert!(out.contains("(run r-list)"));

    let json = permtrail(&config, &["changes", "--json", "--path", "/srv/share/b.txt"]);
    assert!(json.status.success());
    let lines: Vec<String> = stdout(&json).lines().map(str::to_string).collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("\"run_id\":\"r-list\""));

    let none = permtrail(&config, &["changes", "--path", "/srv/share/zzz"]);
    assert!(stdout(&none).contains("No recorded changes."));
}

#[test]
fn test_changes_without_database_creates_nothing() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir, STATIC_TOOL);
    let fresh = dir.path().join("never-audited");

    let output = permtrail(
        &config,
        &["changes", "--output-dir", fresh.to_str().unwrap()],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERR_NOT_FOUND"));
    assert!(!fresh.exists());

    let report = permtrail(&config, &["report", "--output-dir", fresh.to_str().unwrap()]);
    assert_eq!(report.status.code(), Some(1));
    assert!(!fresh.exists());
}

#[test]
fn test_run_appends_to_configured_log_file() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir, GROWING_TOOL);
    let mut text = std::fs::read_to_string(&config).unwrap();
    text = text.replace(
        "[source]",
        "log_file = 'permission_tracker.log'\n\n[source]",
    );
    std::fs::write(&config, text).unwrap();

    assert!(permtrail(&config, &["run", "--no-prompt", "--run-id", "r-log"])
        .status
        .success());
    assert!(permtrail(&config, &["run", "--no-prompt", "--run-id", "r-log-2"])
        .status
        .success());

    let log = std::fs::read_to_string(dir.path().join("permission_tracker.log")).unwrap();
    assert!(log.contains("r-log"));
    assert!(log.contains("r-log-2"));
    assert!(!log.contains('\u{1b}'));
}

#[test]
fn test_rerun_with_same_id_is_duplicate() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir, GROWING_TOOL);
    assert!(permtrail(&config, &["run", "--no-prompt", "--run-id", "r-dup"])
        .status
        .success());

    let again = permtrail(&config, &["run", "--no-prompt", "--run-id", "r-dup"]);

    assert!(again.status.success());
    assert!(stdout(&again).contains("already stored"));
    let rows = permtrail(&config, &["changes", "--json"]);
    assert_eq!(stdout(&rows).lines().count(), 1);
}

#[test]
fn test_report_from_history() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir, GROWING_TOOL);
    assert!(permtrail(&config, &["run", "--no-prompt", "--no-report", "--run-id", "r-rep"])
        .status
        .success());
    let out_dir = dir.path().join("reports");

    let output = permtrail(
        &config,
        &["report", "--run", "r-rep", "--out", out_dir.to_str().unwrap()],
    );

    assert!(output.status.success());
    assert!(stdout(&output).contains("1 change(s)"));
    let html = std::fs::read_to_string(out_dir.join("permission_changes_report.html")).unwrap();
    assert!(html.contains("/srv/share/b.txt"));
}

#[test]
fn test_config_prints_effective_toml() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir, STATIC_TOOL);

    let output = permtrail(&config, &["config", "--target", "/elsewhere"]);

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("target = \"/elsewhere\""));
    assert!(out.contains("[alert]"));
    assert!(out.contains("recipient = \"admin@example.com\""));
}

#[test]
fn test_invalid_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("permtrail.toml");
    std::fs::write(&config, "target = ''\n").unwrap();

    let output = permtrail(&config, &["config"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}
