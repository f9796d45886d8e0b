//! Core types shared across permtrail facilities
//!
//! This crate provides foundational types used by the error handling,
//! logging, persistence and orchestration layers:
//!
//! - **Correlation types**: RunId
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::RunId;
