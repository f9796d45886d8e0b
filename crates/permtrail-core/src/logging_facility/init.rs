//! Logging initialization.
//!
//! Filter precedence: `PERMTRAIL_LOG`, then `RUST_LOG`, then the profile's
//! default directive. Output always goes to stderr so command output on
//! stdout stays clean. [`init_with_log_file`] also appends plain-text lines
//! to a file.

use crate::logging_facility::test_capture::init_test_capture;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::{Mutex, Once};
use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, util::SubscriberInitExt, EnvFilter};

/// Environment variable consulted before `RUST_LOG`
pub const LOG_ENV: &str = "PERMTRAIL_LOG";

/// Logging profile configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable output at debug level
    Development,
    /// JSON lines at info level, for log shippers
    Production,
    /// In-memory capture; see [`init_test_capture`]
    Test,
}

impl Profile {
    /// Directive used when neither environment variable is set
    pub fn default_directive(self) -> &'static str {
        match self {
            Profile::Development | Profile::Test => "permtrail=debug",
            Profile::Production => "permtrail=info",
        }
    }

    fn filter(self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))
    }
}

static INIT_ONCE: Once = Once::new();

/// Install the global subscriber for `profile`.
///
/// Only the first call in a process has an effect. A subscriber installed by
/// someone else is left in place.
///
/// ```
/// use permtrail_core::logging_facility::{init, Profile};
///
/// init(Profile::Development);
/// ```
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| match profile {
        Profile::Development => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(profile.filter())
                .finish()
                .try_init()
                .ok();
        }
        Profile::Production => {
            tracing_subscriber::fmt()
                .json()
                .with_writer(std::io::stderr)
                .with_env_filter(profile.filter())
                .finish()
                .try_init()
                .ok();
        }
        Profile::Test => {
            init_test_capture();
        }
    });
}

/// Like [`init`], and also append every event to the file at `path`.
///
/// The file and its parent directories are created if missing. Under
/// [`Profile::Test`] only the in-memory capture is installed.
///
/// # Errors
///
/// Returns the I/O error if the log file cannot be opened; nothing is
/// installed in that case.
pub fn init_with_log_file(profile: Profile, path: &Path) -> std::io::Result<()> {
    let file = open_log_file(path)?;
    INIT_ONCE.call_once(|| match profile {
        Profile::Test => {
            init_test_capture();
        }
        _ => {
            with_log_file(profile, file).try_init().ok();
        }
    });
    Ok(())
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Stderr output for `profile` plus plain-text lines appended to `file`
fn with_log_file(profile: Profile, file: File) -> impl Subscriber + Send + Sync {
    let json = profile == Profile::Production;
    tracing_subscriber::registry()
        .with(profile.filter())
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
}
