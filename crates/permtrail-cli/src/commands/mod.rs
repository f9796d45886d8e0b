pub mod changes;
pub mod report;
pub mod run;
pub mod show_config;

/// Exit code for a run that completed but lost its store write or its alert
pub const EXIT_DEGRADED: i32 = 2;
