//! Permission source that runs an external enumeration tool.
//!
//! Invocation is `program args... target`; the tool's stdout is the capture.
//! With AccessEnum that is `AccessEnum.exe -accepteula C:\SensitiveData`.

#![allow(clippy::result_large_err)]

use permtrail_core::config::AuditConfig;
use permtrail_core::errors::{AuditError, ExError};
use permtrail_core::source::PermissionSource;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);
/// Longest stderr excerpt carried into an error message
const STDERR_EXCERPT: usize = 512;

#[derive(Debug, Clone)]
pub struct CommandPermissionSource {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandPermissionSource {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(
            config.source.program.clone(),
            config.source.args.clone(),
            config.capture_timeout(),
        )
    }

    /// Poll until the child exits or the deadline passes; on timeout the
    /// child is killed and reaped.
    fn wait_bounded(&self, child: &mut Child, target: &str) -> Result<ExitStatus, AuditError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    child.kill().ok();
                    child.wait().ok();
                    return Err(AuditError::CaptureTimedOut {
                        target: target.to_string(),
                        waited_ms: self.timeout.as_millis() as u64,
                    });
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    return Err(AuditError::SourceUnavailable {
                        target: target.to_string(),
                        reason: format!("waiting for {} failed: {}", self.program, e),
                    })
                }
            }
        }
    }
}

impl PermissionSource for CommandPermissionSource {
    fn capture(&self, target: &str) -> Result<Vec<u8>, ExError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AuditError::SourceUnavailable {
                target: target.to_string(),
                reason: format!("cannot start {}: {}", self.program, e),
            })?;

        // Drain both pipes while waiting so a chatty tool cannot block on a
        // full pipe buffer.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait_bounded(&mut child, target)?;
        let output = join_drain(stdout);

        if !status.success() {
            let stderr = join_drain(stderr);
            let excerpt = String::from_utf8_lossy(&stderr[..stderr.len().min(STDERR_EXCERPT)])
                .trim()
                .to_string();
            tracing::warn!(program = %self.program, path = target, %status, stderr = %excerpt, "Permission source failed");
            return Err(AuditError::SourceExited {
                target: target.to_string(),
                status: status.to_string(),
            }
            .into());
        }

        if output.iter().all(u8::is_ascii_whitespace) {
            return Err(AuditError::EmptyCapture {
                target: target.to_string(),
            }
            .into());
        }

        tracing::debug!(program = %self.program, path = target, bytes = output.len(), "Captured permissions");
        Ok(output)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf).ok();
            buf
        })
    })
}

fn join_drain(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
