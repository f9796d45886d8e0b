//! Snapshot diff computation engine.
//!
//! The core entry point is [`compute_diff`], which walks the current snapshot
//! once and looks up each path in the baseline map, then optionally walks the
//! baseline once more for removals. Both snapshots are ordered maps, so the
//! cost is O((|current| + |baseline|) · log n) with no nested scans.

use crate::model::{ChangeRecord, Changeset, Snapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Knobs for [`compute_diff`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffOptions {
    /// Also report paths present in baseline but missing from current
    pub include_removed: bool,
}

impl DiffOptions {
    pub fn with_removed() -> Self {
        Self {
            include_removed: true,
        }
    }
}

/// Diff with default options (no removals).
pub fn diff(baseline: &Snapshot, current: &Snapshot, observed_at: DateTime<Utc>) -> Changeset {
    compute_diff(baseline, current, observed_at, &DiffOptions::default())
}

/// Compute the changeset between two snapshots.
///
/// Classification:
/// - in `current`, not in `baseline` → `Added` (previous = None)
/// - in both, descriptors differ → `Modified`
/// - in both, descriptors equal → nothing
/// - in `baseline` only → `Removed`, and only if `options.include_removed`
///
/// Added/Modified records come first in path order, then Removed records in
/// path order. Every record carries `observed_at`.
pub fn compute_diff(
    baseline: &Snapshot,
    current: &Snapshot,
    observed_at: DateTime<Utc>,
    options: &DiffOptions,
) -> Changeset {
    let mut records = Vec::new();

    for (path, now) in current.iter() {
        match baseline.get(path) {
            None => records.push(ChangeRecord::added(path, now.clone(), observed_at)),
            Some(before) if before != now => records.push(ChangeRecord::modified(
                path,
                before.clone(),
                now.clone(),
                observed_at,
            )),
            Some(_) => {}
        }
    }

    if options.include_removed {
        for (path, before) in baseline.iter() {
            if !current.contains(path) {
                records.push(ChangeRecord::removed(path, before.clone(), observed_at));
            }
        }
    }

    Changeset::new(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChangeKind;

    #[test]
    fn test_reference_scenario() {
        let baseline = Snapshot::from_pairs([("/data/a.txt", "R-X")]);
        let current = Snapshot::from_pairs([("/data/a.txt", "RWX"), ("/data/b.txt", "R--")]);
        let at = Utc::now();

        let changes = diff(&baseline, &current, at);
        let records = changes.records();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].path(), "/data/a.txt");
        assert_eq!(records[0].kind(), ChangeKind::Modified);
        assert_eq!(records[0].previous().map(|d| d.as_str()), Some("R-X"));
        assert_eq!(records[0].current().map(|d| d.as_str()), Some("RWX"));
        assert_eq!(records[1].path(), "/data/b.txt");
        assert_eq!(records[1].kind(), ChangeKind::Added);
        assert!(records[1].previous().is_none());
        assert_eq!(records[1].current().map(|d| d.as_str()), Some("R--"));
        assert!(records.iter().all(|r| r.observed_at() == at));
    }

    #[test]
    fn test_removed_paths_hidden_by_default() {
        let baseline = Snapshot::from_pairs([("/gone", "R"), ("/kept", "R")]);
        let current = Snapshot::from_pairs([("/kept", "R")]);

        assert!(diff(&baseline, &current, Utc::now()).is_empty());
    }

    #[test]
    fn test_removed_paths_opt_in() {
        let baseline = Snapshot::from_pairs([("/gone", "R"), ("/kept", "R")]);
        let current = Snapshot::from_pairs([("/kept", "W"), ("/new", "X")]);

        let changes = compute_diff(&baseline, &current, Utc::now(), &DiffOptions::with_removed());
        let kinds: Vec<(&str, ChangeKind)> =
            changes.iter().map(|r| (r.path(), r.kind())).collect();

        assert_eq!(
            kinds,
            vec![
                ("/kept", ChangeKind::Modified),
                ("/new", ChangeKind::Added),
                ("/gone", ChangeKind::Removed),
            ]
        );
        let removed = changes.find("/gone").unwrap();
        assert_eq!(removed.previous().map(|d| d.as_str()), Some("R"));
        assert!(removed.current().is_none());
    }

    #[test]
    fn test_empty_baseline_reports_everything_added() {
        let current = Snapshot::from_pairs([("/a", "R"), ("/b", "W")]);
        let changes = diff(&Snapshot::empty(), &current, Utc::now());

        assert_eq!(changes.count_of(ChangeKind::Added), 2);
    }

    #[test]
    fn test_empty_current_reports_nothing_by_default() {
        let baseline = Snapshot::from_pairs([("/a", "R")]);
        assert!(diff(&baseline, &Snapshot::empty(), Utc::now()).is_empty());
    }
}
