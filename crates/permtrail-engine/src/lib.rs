//! permtrail engine - audit run orchestration
//!
//! Coordinates the pure core (parse, diff, notify formatting) with the
//! outside world: an external enumeration tool, the SQLite change store,
//! the SMTP or mail-drop alert sink and the HTML report file.

pub mod fs;
pub mod orchestrator;
pub mod report;
pub mod sink;
pub mod smtp;
pub mod source;
pub mod trigger;

pub use orchestrator::AuditOrchestrator;
pub use report::{write_report, REPORT_FILE};
pub use sink::SpoolAlertSink;
pub use smtp::SmtpAlertSink;
pub use source::CommandPermissionSource;
pub use trigger::{ChannelTrigger, DelayTrigger, ImmediateTrigger, TriggerHandle};
