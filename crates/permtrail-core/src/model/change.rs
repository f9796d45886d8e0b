use crate::model::snapshot::PermissionDescriptor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a detected permission change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Path present in current but not in baseline
    Added,
    /// Path present in both with a different descriptor
    Modified,
    /// Path present in baseline but not in current (opt-in)
    Removed,
}

impl ChangeKind {
    /// Stable name used in storage and alerts
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "Added",
            ChangeKind::Modified => "Modified",
            ChangeKind::Removed => "Removed",
        }
    }

    /// Parse the stable name back into a kind
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Added" => Some(ChangeKind::Added),
            "Modified" => Some(ChangeKind::Modified),
            "Removed" => Some(ChangeKind::Removed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected change to one path
///
/// Constructed only through [`ChangeRecord::added`], [`ChangeRecord::modified`],
/// [`ChangeRecord::removed`] and [`ChangeRecord::from_parts`], which keep `previous`/`current` consistent
/// with `kind`: `previous` is `None` iff the kind is `Added`, and `current`
/// is `None` iff the kind is `Removed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    path: String,
    kind: ChangeKind,
    previous: Option<PermissionDescriptor>,
    current: Option<PermissionDescriptor>,
    observed_at: DateTime<Utc>,
}

impl ChangeRecord {
    pub fn added(
        path: impl Into<String>,
        current: PermissionDescriptor,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Added,
            previous: None,
            current: Some(current),
            observed_at,
        }
    }

    pub fn modified(
        path: impl Into<String>,
        previous: PermissionDescriptor,
        current: PermissionDescriptor,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Modified,
            previous: Some(previous),
            current: Some(current),
            observed_at,
        }
    }

    pub fn removed(
        path: impl Into<String>,
        previous: PermissionDescriptor,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Removed,
            previous: Some(previous),
            current: None,
            observed_at,
        }
    }

    /// Rebuild a record from stored columns.
    ///
    /// Returns `None` when the descriptors do not fit the kind, e.g. an
    /// `Added` row that carries a previous descriptor.
    pub fn from_parts(
        path: impl Into<String>,
        kind: ChangeKind,
        previous: Option<PermissionDescriptor>,
        current: Option<PermissionDescriptor>,
        observed_at: DateTime<Utc>,
    ) -> Option<Self> {
        match (kind, previous, current) {
            (ChangeKind::Added, None, Some(cur)) => Some(Self::added(path, cur, observed_at)),
            (ChangeKind::Modified, Some(prev), Some(cur)) => {
                Some(Self::modified(path, prev, cur, observed_at))
            }
            (ChangeKind::Removed, Some(prev), None) => {
                Some(Self::removed(path, prev, observed_at))
            }
            _ => None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn previous(&self) -> Option<&PermissionDescriptor> {
        self.previous.as_ref()
    }

    pub fn current(&self) -> Option<&PermissionDescriptor> {
        self.current.as_ref()
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    /// Same path, kind and descriptors; the observation time is ignored
    pub fn same_change(&self, other: &ChangeRecord) -> bool {
        self.path == other.path
            && self.kind == other.kind
            && self.previous == other.previous
            && self.current == other.current
    }
}

/// Ordered changes detected by one audit run
///
/// An empty changeset means "nothing to store, nothing to notify".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    records: Vec<ChangeRecord>,
}

impl Changeset {
    pub fn new(records: Vec<ChangeRecord>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChangeRecord> {
        self.records.iter()
    }

    /// Number of records of the given kind
    pub fn count_of(&self, kind: ChangeKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }

    /// Look up the record for a path, if the path changed
    pub fn find(&self, path: &str) -> Option<&ChangeRecord> {
        self.records.iter().find(|r| r.path == path)
    }

    /// Record-by-record [`ChangeRecord::same_change`], in order
    pub fn same_changes(&self, other: &Changeset) -> bool {
        self.records.len() == other.records.len()
            && self
                .records
                .iter()
                .zip(&other.records)
                .all(|(a, b)| a.same_change(b))
    }
}

impl<'a> IntoIterator for &'a Changeset {
    type Item = &'a ChangeRecord;
    type IntoIter = std::slice::Iter<'a, ChangeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
