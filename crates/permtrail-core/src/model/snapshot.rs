use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Effective access rights for one filesystem entity, exactly as the
/// permission source reported them.
///
/// Descriptors are opaque: two descriptors are equal iff their strings are
/// byte-for-byte equal. No platform ACL semantics are applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionDescriptor(String);

impl PermissionDescriptor {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for PermissionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PermissionDescriptor {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PermissionDescriptor {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Point-in-time mapping from normalized path to permission descriptor
///
/// A snapshot is built once from one capture and never mutated afterwards.
/// Entries are kept in path-lexicographic order, which is the order the diff
/// engine walks and therefore the order of every changeset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    entries: BTreeMap<String, PermissionDescriptor>,
}

impl Snapshot {
    /// An empty snapshot (a capture that listed nothing)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from an already normalized map
    pub fn from_map(entries: BTreeMap<String, PermissionDescriptor>) -> Self {
        Self { entries }
    }

    /// Build a snapshot from `(path, descriptor)` string pairs
    ///
    /// Later pairs overwrite earlier ones with the same path.
    ///
    /// ```
    /// use permtrail_core::model::Snapshot;
    ///
    /// let snap = Snapshot::from_pairs([("/data/a.txt", "R-X"), ("/data/b.txt", "RW-")]);
    /// assert_eq!(snap.len(), 2);
    /// assert_eq!(snap.get("/data/a.txt").map(|d| d.as_str()), Some("R-X"));
    /// ```
    pub fn from_pairs<I, P, D>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, D)>,
        P: Into<String>,
        D: Into<PermissionDescriptor>,
    {
        pairs
            .into_iter()
            .map(|(p, d)| (p.into(), d.into()))
            .collect()
    }

    pub fn get(&self, path: &str) -> Option<&PermissionDescriptor> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in path order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PermissionDescriptor)> {
        self.entries.iter().map(|(p, d)| (p.as_str(), d))
    }

    /// Iterate paths in order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|p| p.as_str())
    }
}

impl FromIterator<(String, PermissionDescriptor)> for Snapshot {
    fn from_iter<T: IntoIterator<Item = (String, PermissionDescriptor)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
