//! HTML report output.

#![allow(clippy::result_large_err)]

use crate::fs::atomic_write;
use permtrail_core::model::Changeset;
use permtrail_core::render::render_html_report;
use permtrail_store::errors::Result;
use std::path::{Path, PathBuf};

/// File name of the report inside the output directory
pub const REPORT_FILE: &str = "permission_changes_report.html";

/// Render `changeset` and write it to `<dir>/permission_changes_report.html`,
/// replacing any previous report. Returns the path written.
///
/// # Errors
///
/// `ExErrorKind::Io` if the directory or file cannot be written.
pub fn write_report(dir: &Path, changeset: &Changeset) -> Result<PathBuf> {
    let path = dir.join(REPORT_FILE);
    atomic_write(&path, render_html_report(changeset).as_bytes())?;
    tracing::info!(path = %path.display(), records = changeset.len(), "Report generated");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use permtrail_core::model::ChangeRecord;

    #[test]
    fn test_report_written_to_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let cs = Changeset::new(vec![ChangeRecord::added(
            "C:\\Data\\<new>.txt",
            "R--".into(),
            Utc::now(),
        )]);

        let path = write_report(dir.path(), &cs).unwrap();

        assert_eq!(path, dir.path().join(REPORT_FILE));
        let html = std::fs::read_to_string(path).unwrap();
        assert!(html.contains("&lt;new&gt;.txt"));
        assert!(html.contains("R--"));
    }
}
