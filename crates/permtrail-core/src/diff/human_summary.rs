//! Human-readable summary renderer for changesets.

use crate::model::{ChangeKind, ChangeRecord, Changeset, PermissionDescriptor};

/// Render a plain-text summary of a [`Changeset`].
///
/// Every record is listed with its path, kind, previous and current
/// descriptors. Absent descriptors render as `None`. This is the body of
/// alert messages, so it stays plain text with no markup.
pub fn render_human_summary(changeset: &Changeset) -> String {
    if changeset.is_empty() {
        return "No permission changes detected.\n".to_string();
    }

    let mut out = String::new();
    out.push_str("The following permission changes were detected:\n\n");

    out.push_str(&format!(
        "Total: {} (added: {}, modified: {}",
        changeset.len(),
        changeset.count_of(ChangeKind::Added),
        changeset.count_of(ChangeKind::Modified),
    ));
    let removed = changeset.count_of(ChangeKind::Removed);
    if removed > 0 {
        out.push_str(&format!(", removed: {}", removed));
    }
    out.push_str(")\n\n");

    for record in changeset {
        push_record(&mut out, record);
    }

    out
}

fn push_record(out: &mut String, record: &ChangeRecord) {
    out.push_str(&format!("Path: {}\n", record.path()));
    out.push_str(&format!("Type: {}\n", record.kind()));
    out.push_str(&format!("Old Permissions: {}\n", or_none(record.previous())));
    out.push_str(&format!("New Permissions: {}\n", or_none(record.current())));
    out.push_str(&format!(
        "Observed: {}\n\n",
        record.observed_at().to_rfc3339()
    ));
}

fn or_none(descriptor: Option<&PermissionDescriptor>) -> &str {
    descriptor.map(|d| d.as_str()).unwrap_or("None")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_empty_changeset_summary() {
        assert_eq!(
            render_human_summary(&Changeset::empty()),
            "No permission changes detected.\n"
        );
    }

    #[test]
    fn test_every_record_is_listed() {
        let now = Utc::now();
        let cs = Changeset::new(vec![
            ChangeRecord::modified("C:\\Data\\a.txt", "R-X".into(), "RWX".into(), now),
            ChangeRecord::added("C:\\Data\\b.txt", "R--".into(), now),
        ]);

        let text = render_human_summary(&cs);

        assert!(text.contains("Total: 2 (added: 1, modified: 1)"));
        assert!(text.contains("Path: C:\\Data\\a.txt\nType: Modified\nOld Permissions: R-X\nNew Permissions: RWX\n"));
        assert!(text.contains("Path: C:\\Data\\b.txt\nType: Added\nOld Permissions: None\nNew Permissions: R--\n"));
    }

    #[test]
    fn test_removed_count_only_when_present() {
        let now = Utc::now();
        let cs = Changeset::new(vec![ChangeRecord::removed("/x", "R".into(), now)]);
        let text = render_human_summary(&cs);

        assert!(text.contains("removed: 1"));
        assert!(text.contains("New Permissions: None"));
    }
}
