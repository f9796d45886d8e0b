pub mod html_report;

pub use html_report::{escape_html, render_html_report};
