//! Capture normalization.
//!
//! Turns the raw bytes produced by a permission source into a [`Snapshot`]
//! and a [`SnapshotRef`] that identifies the capture in an audit run record.
//!
//! ## Non-Responsibilities
//!
//! - Running the permission source (handled by `permtrail-engine`)
//! - Logging skip counts (the orchestrator logs them)
//!
//! [`Snapshot`]: crate::model::Snapshot
//! [`SnapshotRef`]: crate::model::SnapshotRef

pub mod digest;
pub mod parser;

pub use digest::{compute_capture_digest, snapshot_ref};
pub use parser::{parse, parse_file, parse_text, LineFormat, ParseStats, ParsedSnapshot};
