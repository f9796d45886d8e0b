//! Repository layer: SQL for each table, kept apart from locking and
//! transaction handling in [`crate::sqlite_store`].

pub mod changes;
pub mod runs;
