//! Snapshot diff engine.
//!
//! Compares a baseline snapshot with a current snapshot and produces a
//! [`Changeset`] suitable for persistence, alerting and reporting.
//!
//! ## Entry point
//!
//! ```
//! use chrono::Utc;
//! use permtrail_core::diff::diff;
//! use permtrail_core::model::Snapshot;
//!
//! let baseline = Snapshot::from_pairs([("/data/a.txt", "R-X")]);
//! let current = Snapshot::from_pairs([("/data/a.txt", "RWX"), ("/data/b.txt", "R--")]);
//! let changes = diff(&baseline, &current, Utc::now());
//! assert_eq!(changes.len(), 2);
//! let summary = permtrail_core::diff::render_human_summary(&changes);
//! assert!(summary.contains("/data/b.txt"));
//! ```
//!
//! ## Guarantees
//!
//! - **Purity**: no I/O; the observation time is supplied by the caller.
//! - **Determinism**: records follow path order of the current snapshot.
//! - **Current-only paths**: by default every reported path exists in `current`.
//!   Removals are reported only when [`DiffOptions::include_removed`] is set.
//!
//! [`Changeset`]: crate::model::Changeset

pub mod engine;
pub mod human_summary;

pub use engine::{compute_diff, diff, DiffOptions};
pub use human_summary::render_human_summary;
