//! permtrail store - durable change log on SQLite
//!
//! Provides:
//! - [`SqliteChangeStore`], the `ChangeStore` implementation
//! - Embedded, checksummed schema migrations
//! - Row-level repositories for the change log and the run ledger

pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;
pub mod sqlite_store;

// Re-export key types
pub use errors::Result;
pub use sqlite_store::SqliteChangeStore;
