//! Trigger implementations.
//!
//! The CLI adds an operator prompt on top of these; see `permtrail-cli`.

#![allow(clippy::result_large_err)]

use permtrail_core::errors::{AuditError, ExError, ExErrorKind};
use permtrail_core::source::Trigger;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Mutex;
use std::time::Duration;

/// Fires as soon as it is awaited
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateTrigger;

impl Trigger for ImmediateTrigger {
    fn wait(&self, _timeout: Option<Duration>) -> Result<(), ExError> {
        Ok(())
    }
}

/// Fires after a fixed delay; a delay longer than the timeout times out
#[derive(Debug, Clone, Copy)]
pub struct DelayTrigger {
    delay: Duration,
}

impl DelayTrigger {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Trigger for DelayTrigger {
    fn wait(&self, timeout: Option<Duration>) -> Result<(), ExError> {
        match timeout {
            Some(limit) if limit < self.delay => {
                std::thread::sleep(limit);
                Err(AuditError::TriggerTimedOut {
                    waited_ms: limit.as_millis() as u64,
                }
                .into())
            }
            _ => {
                std::thread::sleep(self.delay);
                Ok(())
            }
        }
    }
}

/// Fires when its [`TriggerHandle`] is fired from another thread
#[derive(Debug)]
pub struct ChannelTrigger {
    rx: Mutex<Receiver<()>>,
}

/// Sending half of a [`ChannelTrigger`]. Dropping every handle without
/// firing cancels the wait.
#[derive(Debug, Clone)]
pub struct TriggerHandle {
    tx: Sender<()>,
}

impl ChannelTrigger {
    pub fn new() -> (Self, TriggerHandle) {
        let (tx, rx) = mpsc::channel();
        (Self { rx: Mutex::new(rx) }, TriggerHandle { tx })
    }
}

impl TriggerHandle {
    /// Signal the trigger; returns false if nobody is listening any more
    pub fn fire(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

impl Trigger for ChannelTrigger {
    fn wait(&self, timeout: Option<Duration>) -> Result<(), ExError> {
        let rx = self.rx.lock().map_err(|_| {
            ExError::new(ExErrorKind::Concurrency)
                .with_op("await_trigger")
                .with_message("trigger receiver lock poisoned")
        })?;

        let received = match timeout {
            Some(limit) => rx.recv_timeout(limit).map_err(|e| match e {
                RecvTimeoutError::Timeout => AuditError::TriggerTimedOut {
                    waited_ms: limit.as_millis() as u64,
                },
                RecvTimeoutError::Disconnected => AuditError::TriggerCancelled,
            }),
            None => rx.recv().map_err(|_| AuditError::TriggerCancelled),
        };
        received.map_err(ExError::from)
    }
}
