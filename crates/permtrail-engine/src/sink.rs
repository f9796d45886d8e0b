//! Mail-drop alert sink.
//!
//! Each alert becomes one RFC 5322 style message file in a spool directory,
//! written atomically. A local MTA, a pickup service or an operator picks
//! them up from there.

#![allow(clippy::result_large_err)]

use crate::fs::atomic_write;
use chrono::Utc;
use permtrail_core::errors::{AuditError, ExError};
use permtrail_core::notify::AlertSink;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static MESSAGE_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct SpoolAlertSink {
    dir: PathBuf,
    sender: String,
}

impl SpoolAlertSink {
    pub fn new(dir: impl Into<PathBuf>, sender: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            sender: sender.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

pub(crate) fn reject(recipient: &str, reason: impl Into<String>) -> ExError {
    AuditError::SinkRejected {
        recipient: recipient.to_string(),
        reason: reason.into(),
    }
    .into()
}

/// Refuse recipients that are not addresses and header values that could
/// smuggle extra headers
pub(crate) fn check_headers(recipient: &str, subject: &str, sender: &str) -> Result<(), ExError> {
    if !recipient.contains('@') {
        return Err(reject(recipient, "recipient is not an address"));
    }
    if [recipient, subject, sender]
        .iter()
        .any(|h| h.contains(['\r', '\n']))
    {
        return Err(reject(recipient, "header value contains a line break"));
    }
    Ok(())
}

impl AlertSink for SpoolAlertSink {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), ExError> {
        check_headers(recipient, subject, &self.sender)?;

        let now = Utc::now();
        let mut message = format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nDate: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n",
            self.sender,
            recipient,
            subject,
            now.to_rfc2822()
        );
        for line in body.lines() {
            message.push_str(line);
            message.push_str("\r\n");
        }

        let file_name = format!(
            "{}-{}-{}.eml",
            now.format("%Y%m%dT%H%M%S%3fZ"),
            std::process::id(),
            MESSAGE_SEQ.fetch_add(1, Ordering::Relaxed)
        );
        atomic_write(&self.dir.join(&file_name), message.as_bytes())
            .map_err(|e| reject(recipient, e.to_string()))?;

        tracing::info!(recipient, file = %file_name, "Alert spooled");
        Ok(())
    }
}
