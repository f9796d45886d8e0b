//! Structured logging facility for permtrail
//!
//! This module provides a canonical logging facility with:
//! - Single initialization point via `init(profile)`, or `init_with_log_file`
//!   to keep a persistent log as well
//! - Structured logging macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use permtrail_core::logging_facility::{init, Profile};
//!
//! // Initialize once at application startup
//! init(Profile::Development);
//! ```
//!
//! # Logging Macros
//!
//! - `log_op_start!(op, ...)` - Log operation start
//! - `log_op_end!(op, duration_ms = ...)` - Log operation end
//! - `log_op_error!(op, err, duration_ms = ...)` - Log operation error

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, init_with_log_file, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
