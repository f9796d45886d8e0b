use crate::model::{ChangeKind, Changeset};

/// Render a changeset as a standalone HTML document
///
/// One table row per record with Path, Change Type, Old Permissions and New
/// Permissions columns. Every value is HTML-escaped, since paths and
/// descriptors come straight from an external tool.
pub fn render_html_report(changeset: &Changeset) -> String {
    let mut out = String::new();

    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<title>Permission Changes Report</title>\n</head>\n<body>\n");
    out.push_str("<h1>Permission Changes Report</h1>\n");

    if changeset.is_empty() {
        out.push_str("<p>No permission changes detected.</p>\n</body>\n</html>\n");
        return out;
    }

    out.push_str(&format!(
        "<p>{} change(s): {} added, {} modified, {} removed</p>\n",
        changeset.len(),
        changeset.count_of(ChangeKind::Added),
        changeset.count_of(ChangeKind::Modified),
        changeset.count_of(ChangeKind::Removed),
    ));
    out.push_str("<table border='1'>\n");
    out.push_str("<tr><th>Path</th><th>Change Type</th><th>Old Permissions</th><th>New Permissions</th><th>Observed</th></tr>\n");

    for record in changeset {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(record.path()),
            record.kind(),
            escape_html(record.previous().map(|d| d.as_str()).unwrap_or("None")),
            escape_html(record.current().map(|d| d.as_str()).unwrap_or("None")),
            record.observed_at().to_rfc3339(),
        ));
    }

    out.push_str("</table>\n</body>\n</html>\n");
    out
}

/// Escape the five HTML-significant characters
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
