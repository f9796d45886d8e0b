//! Changeset → alert formatting and bounded dispatch.

use crate::diff::render_human_summary;
use crate::model::Changeset;
use crate::notify::sink::AlertSink;
use crate::notify::NotifyResult;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

/// Subject line used when none is configured
pub const DEFAULT_SUBJECT: &str = "Unauthorized Permission Changes Detected";

/// Formats changesets and dispatches them through an [`AlertSink`]
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn AlertSink>,
    recipient: String,
    subject: String,
    dispatch_timeout: Option<Duration>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn AlertSink>, recipient: impl Into<String>) -> Self {
        Self {
            sink,
            recipient: recipient.into(),
            subject: DEFAULT_SUBJECT.to_string(),
            dispatch_timeout: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Bound how long [`Notifier::notify`] waits for the sink
    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = Some(timeout);
        self
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Send one alert covering every record in `changeset`.
    ///
    /// Returns `Skipped` without touching the sink if the changeset is empty.
    /// Makes exactly one send attempt otherwise.
    ///
    /// With a dispatch timeout the send runs on a worker thread. If the sink
    /// does not answer in time the result is `Failed`; the worker is left to
    /// finish on its own and logs its late answer at warn level, since an
    /// alert reported as failed may still have been delivered.
    pub fn notify(&self, changeset: &Changeset) -> NotifyResult {
        if changeset.is_empty() {
            return NotifyResult::Skipped;
        }

        let body = render_human_summary(changeset);
        match self.dispatch_timeout {
            None => self.outcome(self.sink.send(&self.recipient, &self.subject, &body)),
            Some(timeout) => self.send_bounded(body, timeout),
        }
    }

    fn send_bounded(&self, body: String, timeout: Duration) -> NotifyResult {
        let (tx, rx) = mpsc::channel();
        let sink = Arc::clone(&self.sink);
        let recipient = self.recipient.clone();
        let subject = self.subject.clone();

        std::thread::spawn(move || {
            let sent = sink.send(&recipient, &subject, &body);
            // The receiver is gone only when the wait already timed out
            if let Err(mpsc::SendError(late)) = tx.send(sent) {
                match late {
                    Ok(()) => tracing::warn!(
                        recipient = recipient.as_str(),
                        outcome = "sent",
                        "Alert delivered after the dispatch timeout"
                    ),
                    Err(e) => tracing::warn!(
                        recipient = recipient.as_str(),
                        outcome = "failed",
                        error = %e,
                        "Alert failed after the dispatch timeout"
                    ),
                }
            }
        });

        match rx.recv_timeout(timeout) {
            Ok(sent) => self.outcome(sent),
            Err(RecvTimeoutError::Timeout) => NotifyResult::Failed(format!(
                "alert dispatch timed out after {}ms",
                timeout.as_millis()
            )),
            Err(RecvTimeoutError::Disconnected) => {
                NotifyResult::Failed("alert sink terminated without answering".to_string())
            }
        }
    }

    fn outcome(&self, sent: Result<(), crate::errors::ExError>) -> NotifyResult {
        match sent {
            Ok(()) => NotifyResult::Sent,
            Err(e) => NotifyResult::Failed(e.to_string()),
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("recipient", &self.recipient)
            .field("subject", &self.subject)
            .field("dispatch_timeout", &self.dispatch_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ExError, ExErrorKind};
    use crate::model::ChangeRecord;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(String, String, String)>>,
    }

    impl AlertSink for RecordingSink {
        fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), ExError> {
            self.sent.lock().unwrap().push((
                recipient.to_string(),
                subject.to_string(),
                body.to_string(),
            ));
            Ok(())
        }
    }

    struct RejectingSink;

    impl AlertSink for RejectingSink {
        fn send(&self, _: &str, _: &str, _: &str) -> Result<(), ExError> {
            Err(ExError::new(ExErrorKind::Notify).with_message("relay refused"))
        }
    }

    struct SlowSink(Duration);

    impl AlertSink for SlowSink {
        fn send(&self, _: &str, _: &str, _: &str) -> Result<(), ExError> {
            std::thread::sleep(self.0);
            Ok(())
        }
    }

    fn one_change() -> Changeset {
        Changeset::new(vec![ChangeRecord::added("/data/b.txt", "R--".into(), Utc::now())])
    }

    #[test]
    fn test_empty_changeset_is_skipped() {
        let sink = Arc::new(RecordingSink::default());
        let notifier = Notifier::new(sink.clone(), "admin@example.com");

        assert_eq!(notifier.notify(&Changeset::empty()), NotifyResult::Skipped);
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_sends_once_with_full_body() {
        let sink = Arc::new(RecordingSink::default());
        let notifier = Notifier::new(sink.clone(), "admin@example.com");

        assert_eq!(notifier.notify(&one_change()), NotifyResult::Sent);

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "admin@example.com");
        assert_eq!(sent[0].1, DEFAULT_SUBJECT);
        assert!(sent[0].2.contains("Path: /data/b.txt"));
    }

    #[test]
    fn test_rejection_is_reported() {
        let notifier = Notifier::new(Arc::new(RejectingSink), "admin@example.com");
        match notifier.notify(&one_change()) {
            NotifyResult::Failed(reason) => assert!(reason.contains("relay refused")),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_bounded_dispatch_times_out() {
        let notifier = Notifier::new(
            Arc::new(SlowSink(Duration::from_millis(500))),
            "admin@example.com",
        )
        .with_dispatch_timeout(Duration::from_millis(20));

        match notifier.notify(&one_change()) {
            NotifyResult::Failed(reason) => assert!(reason.contains("timed out")),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_late_delivery_is_logged() {
        let capture = crate::logging_facility::test_capture::init_test_capture();
        let notifier = Notifier::new(
            Arc::new(SlowSink(Duration::from_millis(100))),
            "late@example.com",
        )
        .with_dispatch_timeout(Duration::from_millis(10));

        assert!(matches!(
            notifier.notify(&one_change()),
            NotifyResult::Failed(_)
        ));

        let late = |e: &crate::logging_facility::test_capture::CapturedEvent| {
            e.level == tracing::Level::WARN
                && e.field("recipient") == Some("late@example.com")
                && e.field("outcome") == Some("sent")
        };
        for _ in 0..200 {
            if capture.count_events(late) > 0 {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("late delivery was never logged");
    }

    #[test]
    fn test_bounded_dispatch_passes_through_success() {
        let sink = Arc::new(RecordingSink::default());
        let notifier = Notifier::new(sink.clone(), "ops@example.com")
            .with_subject("perm drift")
            .with_dispatch_timeout(Duration::from_secs(5));

        assert_eq!(notifier.notify(&one_change()), NotifyResult::Sent);
        assert_eq!(sink.sent.lock().unwrap()[0].1, "perm drift");
    }
}
