//! Permission-source output parser.
//!
//! A line is a snapshot entry iff, after trimming, it splits into a path and
//! a non-empty descriptor, and the path contains one of the configured
//! separators. The split happens at the first tab when the line has one
//! (enumeration tools emit tab-separated columns so that paths may contain
//! spaces), otherwise at the first whitespace run.
//!
//! Malformed lines are counted, never fatal. Only input that cannot be read
//! or decoded at all is an error.

use crate::errors::{AuditError, Result};
use crate::model::{PermissionDescriptor, Snapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Which characters mark a token as a filesystem path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineFormat {
    pub separators: Vec<char>,
}

impl LineFormat {
    pub fn new(separators: impl IntoIterator<Item = char>) -> Self {
        Self {
            separators: separators.into_iter().collect(),
        }
    }

    /// Backslash-separated paths only
    pub fn windows() -> Self {
        Self::new(['\\'])
    }

    /// Slash-separated paths only
    pub fn unix() -> Self {
        Self::new(['/'])
    }

    fn is_path(&self, token: &str) -> bool {
        token.chars().any(|c| self.separators.contains(&c))
    }
}

impl Default for LineFormat {
    fn default() -> Self {
        Self::new(['\\', '/'])
    }
}

/// Line accounting for one parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    /// Lines accepted as entries (including later-overwritten duplicates)
    pub accepted: usize,
    /// Non-blank lines that were not entries
    pub skipped: usize,
    /// Entries whose path had already been seen; the later line wins
    pub duplicates: usize,
    /// Empty or whitespace-only lines
    pub blank: usize,
}

/// A normalized snapshot plus the accounting that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSnapshot {
    pub snapshot: Snapshot,
    pub stats: ParseStats,
}

/// Parse raw capture bytes.
///
/// Accepts UTF-8 (with or without BOM) and BOM-marked UTF-16 in either byte
/// order. CRLF and LF line endings are both accepted.
///
/// # Errors
///
/// `UnreadableCapture` if the bytes cannot be decoded as text.
pub fn parse(raw: &[u8], format: &LineFormat) -> Result<ParsedSnapshot> {
    let text = decode(raw)?;
    Ok(parse_text(&text, format))
}

/// Read and parse a capture file.
///
/// # Errors
///
/// `UnreadableCapture` if the file cannot be read or decoded.
pub fn parse_file(path: &Path, format: &LineFormat) -> Result<ParsedSnapshot> {
    let raw = std::fs::read(path).map_err(|e| AuditError::UnreadableCapture {
        reason: format!("cannot read {}: {}", path.display(), e),
    })?;
    parse(&raw, format)
}

/// Parse already-decoded capture text.
pub fn parse_text(text: &str, format: &LineFormat) -> ParsedSnapshot {
    let mut entries: BTreeMap<String, PermissionDescriptor> = BTreeMap::new();
    let mut stats = ParseStats::default();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            stats.blank += 1;
            continue;
        }

        match split_entry(line) {
            Some((path, descriptor)) if format.is_path(path) => {
                stats.accepted += 1;
                if entries
                    .insert(path.to_string(), PermissionDescriptor::new(descriptor))
                    .is_some()
                {
                    stats.duplicates += 1;
                }
            }
            _ => stats.skipped += 1,
        }
    }

    ParsedSnapshot {
        snapshot: Snapshot::from_map(entries),
        stats,
    }
}

fn split_entry(line: &str) -> Option<(&str, &str)> {
    let (path, rest) = match line.split_once('\t') {
        Some(parts) => parts,
        None => line.split_once(char::is_whitespace)?,
    };
    let path = path.trim_end();
    let descriptor = rest.trim();
    if path.is_empty() || descriptor.is_empty() {
        return None;
    }
    Some((path, descriptor))
}

fn decode(raw: &[u8]) -> Result<String> {
    match raw {
        [0xEF, 0xBB, 0xBF, rest @ ..] => utf8(rest),
        [0xFF, 0xFE, rest @ ..] => utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => utf16(rest, u16::from_be_bytes),
        _ => utf8(raw),
    }
}

fn utf8(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| AuditError::UnreadableCapture {
            reason: format!("capture is not valid UTF-8: {}", e),
        })
}

fn utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(AuditError::UnreadableCapture {
            reason: "UTF-16 capture has an odd number of bytes".to_string(),
        });
    }
    let units = bytes.chunks_exact(2).map(|pair| to_unit([pair[0], pair[1]]));
    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| AuditError::UnreadableCapture {
            reason: format!("capture is not valid UTF-16: {}", e),
        })
}
