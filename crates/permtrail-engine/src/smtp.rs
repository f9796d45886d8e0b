//! SMTP alert sink.
//!
//! Plain SMTP submission without TLS or authentication, one connection per
//! alert. Meant for a relay on the local host or network.

#![allow(clippy::result_large_err)]

use crate::sink::{check_headers, reject};
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::SmtpTransport;
use lettre::Transport;
use permtrail_core::errors::ExError;
use permtrail_core::notify::AlertSink;
use std::time::Duration;

/// Connect and command timeout used when none is given
pub const DEFAULT_SMTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SmtpAlertSink {
    host: String,
    port: u16,
    sender: String,
    timeout: Duration,
}

impl SmtpAlertSink {
    pub fn new(host: impl Into<String>, port: u16, sender: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            sender: sender.into(),
            timeout: DEFAULT_SMTP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn server(&self) -> (&str, u16) {
        (&self.host, self.port)
    }

    fn message(&self, recipient: &str, subject: &str, body: &str) -> Result<Message, ExError> {
        let from: Mailbox = self
            .sender
            .parse()
            .map_err(|e| reject(recipient, format!("invalid sender {}: {}", self.sender, e)))?;
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| reject(recipient, format!("invalid recipient: {}", e)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| reject(recipient, e.to_string()))
    }
}

impl AlertSink for SmtpAlertSink {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), ExError> {
        check_headers(recipient, subject, &self.sender)?;
        let message = self.message(recipient, subject, body)?;

        let transport = SmtpTransport::builder_dangerous(self.host.as_str())
            .port(self.port)
            .timeout(Some(self.timeout))
            .build();

        tracing::debug!(host = %self.host, port = self.port, "Connecting to SMTP server");
        transport.send(&message).map_err(|e| {
            reject(
                recipient,
                format!("SMTP {}:{}: {}", self.host, self.port, e),
            )
        })?;

        tracing::info!(recipient, host = %self.host, port = self.port, "Alert sent");
        Ok(())
    }
}
