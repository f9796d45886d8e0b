//! Embedded SQL migrations
//!
//! Migrations are embedded at compile time using include_str!

/// Migration metadata
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

/// Get all embedded migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            id: "001_permission_changes",
            sql: include_str!("../../migrations/001_permission_changes.sql"),
        },
        Migration {
            id: "002_audit_runs",
            sql: include_str!("../../migrations/002_audit_runs.sql"),
        },
        Migration {
            id: "003_audit_run_attempts",
            sql: include_str!("../../migrations/003_audit_run_attempts.sql"),
        },
    ]
}
