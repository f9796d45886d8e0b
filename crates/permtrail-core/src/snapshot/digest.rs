//! Digest computation for raw captures.
//!
//! The digest identifies exactly which bytes a run compared, so two runs that
//! saw the same capture can be recognised from their run records alone.

use crate::model::SnapshotRef;
use crate::snapshot::parser::ParsedSnapshot;
use sha2::{Digest, Sha256};

/// Compute the SHA-256 of raw capture bytes.
///
/// ## Returns
///
/// Hex-encoded SHA256 digest (64 characters)
///
/// ## Example
///
/// ```
/// use permtrail_core::snapshot::digest::compute_capture_digest;
///
/// let digest = compute_capture_digest(b"C:\\Data\\a.txt RWX\n");
/// assert_eq!(digest.len(), 64);
/// ```
pub fn compute_capture_digest(raw: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw);
    hex::encode(hasher.finalize())
}

/// Build the run-record reference for a parsed capture
pub fn snapshot_ref(raw: &[u8], parsed: &ParsedSnapshot) -> SnapshotRef {
    SnapshotRef {
        digest: compute_capture_digest(raw),
        entries: parsed.snapshot.len(),
        skipped: parsed.stats.skipped,
        duplicates: parsed.stats.duplicates,
    }
}
