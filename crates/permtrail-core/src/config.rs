//! Resolved audit configuration.
//!
//! `AuditConfig` is built once before a run (by the CLI from a TOML file, or
//! directly by an embedding program) and passed by reference to the
//! orchestrator and its collaborators. Nothing reads configuration from
//! process-wide state.

use crate::diff::DiffOptions;
use crate::errors::{AuditError, Result};
use crate::notify::DEFAULT_SUBJECT;
use crate::snapshot::LineFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// File name of the change database inside `output_dir`
pub const DEFAULT_DB_FILE: &str = "permissions.db";
/// Directory name of the alert mail drop inside `output_dir`
pub const DEFAULT_SPOOL_DIR: &str = "outbox";
/// Conventional name for `log_file`
pub const DEFAULT_LOG_FILE: &str = "permission_tracker.log";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Directory tree to audit
    pub target: String,
    /// Where the database, reports, archived captures and mail drop live
    pub output_dir: PathBuf,
    /// Change database; defaults to `<output_dir>/permissions.db`
    pub database: Option<PathBuf>,
    /// Report paths that disappeared between captures
    pub include_removed: bool,
    /// Keep each run's raw captures next to the database
    pub archive_captures: bool,
    /// Append audit run logs to this file as well as stderr; relative paths
    /// are taken from `output_dir`
    pub log_file: Option<PathBuf>,
    pub source: SourceConfig,
    pub alert: AlertConfig,
    pub timeouts: TimeoutConfig,
    pub line_format: LineFormat,
}

/// External enumeration tool invocation: `program args... target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub program: String,
    pub args: Vec<String>,
}

/// How alerts leave the process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertTransport {
    /// Plain SMTP submission to `host:port`
    #[default]
    Smtp,
    /// One message file per alert in the mail drop directory
    Spool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub transport: AlertTransport,
    /// SMTP server, used with the `smtp` transport
    pub host: String,
    pub port: u16,
    pub recipient: String,
    pub sender: String,
    pub subject: String,
    /// Mail drop directory; defaults to `<output_dir>/outbox`
    pub spool_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub capture_secs: u64,
    /// `None` waits for the trigger indefinitely
    pub trigger_secs: Option<u64>,
    pub notify_secs: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            target: "C:\\SensitiveData".to_string(),
            output_dir: PathBuf::from("."),
            database: None,
            include_removed: false,
            archive_captures: true,
            log_file: None,
            source: SourceConfig::default(),
            alert: AlertConfig::default(),
            timeouts: TimeoutConfig::default(),
            line_format: LineFormat::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            program: "C:\\Windows\\Sysinternals\\AccessEnum.exe".to_string(),
            args: vec!["-accepteula".to_string()],
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            transport: AlertTransport::Smtp,
            host: "localhost".to_string(),
            port: 1025,
            recipient: "admin@example.com".to_string(),
            sender: "file_activity_tracker@localhost".to_string(),
            subject: DEFAULT_SUBJECT.to_string(),
            spool_dir: None,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            capture_secs: 300,
            trigger_secs: None,
            notify_secs: 30,
        }
    }
}

impl AuditConfig {
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.output_dir.join(DEFAULT_DB_FILE))
    }

    pub fn spool_dir(&self) -> PathBuf {
        self.alert
            .spool_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.join(DEFAULT_SPOOL_DIR))
    }

    /// Resolved log file, if one is configured
    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file.as_ref().map(|file| {
            if file.is_absolute() {
                file.clone()
            } else {
                self.output_dir.join(file)
            }
        })
    }

    /// Where archived captures go, if archiving is enabled
    pub fn archive_dir(&self) -> Option<PathBuf> {
        self.archive_captures.then(|| self.output_dir.clone())
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.capture_secs)
    }

    pub fn trigger_timeout(&self) -> Option<Duration> {
        self.timeouts.trigger_secs.map(Duration::from_secs)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.notify_secs)
    }

    pub fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            include_removed: self.include_removed,
        }
    }

    /// Reject configurations no run could succeed with
    ///
    /// # Errors
    ///
    /// `InvalidConfig` naming the first unusable value.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(AuditError::InvalidConfig {
                reason: reason.to_string(),
            })
        };

        if self.target.trim().is_empty() {
            return invalid("target must not be empty");
        }
        if self.source.program.trim().is_empty() {
            return invalid("source.program must not be empty");
        }
        if self.alert.recipient.trim().is_empty() {
            return invalid("alert.recipient must not be empty");
        }
        if self.alert.transport == AlertTransport::Smtp
            && (self.alert.host.trim().is_empty() || self.alert.port == 0)
        {
            return invalid("alert.host and alert.port must name an SMTP server");
        }
        if self.line_format.separators.is_empty() {
            return invalid("line_format.separators must list at least one separator");
        }
        if self.timeouts.capture_secs == 0 || self.timeouts.notify_secs == 0 {
            return invalid("capture and notify timeouts must be at least one second");
        }
        Ok(())
    }
}
