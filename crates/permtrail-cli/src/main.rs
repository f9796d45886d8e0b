//! permtrail CLI
//!
//! Command-line interface for permission-change auditing

use clap::{Parser, Subcommand};
use permtrail_core::logging_facility::{init, init_with_log_file, Profile};
use std::path::PathBuf;

mod commands;
mod config;
mod prompt;

#[derive(Debug, Parser)]
#[command(name = "permtrail")]
#[command(about = "permtrail - Directory permission change auditing", long_about = None)]
struct Cli {
    /// TOML configuration file (missing file means built-in defaults)
    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Emit JSON logs instead of human-readable ones
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Capture a baseline, wait for the trigger, capture again and report changes
    Run(commands::run::RunArgs),
    /// List recorded permission changes
    Changes(commands::changes::ChangesArgs),
    /// Render an HTML report from recorded changes
    Report(commands::report::ReportArgs),
    /// Print the effective configuration as TOML
    Config(commands::show_config::ShowConfigArgs),
}

fn main() {
    let cli = Cli::parse();

    let profile = if cli.log_json {
        Profile::Production
    } else {
        Profile::Development
    };
    init_logging(&cli, profile);

    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(&cli.config, args),
        Commands::Changes(args) => commands::changes::execute(&cli.config, args),
        Commands::Report(args) => commands::report::execute(&cli.config, args),
        Commands::Config(args) => commands::show_config::execute(&cli.config, args),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Audit runs also log to the configured `log_file`. A config error is left
/// for the command itself to report.
fn init_logging(cli: &Cli, profile: Profile) {
    let log_path = match &cli.command {
        Commands::Run(args) => config::resolve(&cli.config, &args.overrides())
            .ok()
            .and_then(|c| c.log_path()),
        _ => None,
    };

    match log_path {
        Some(path) => {
            if let Err(e) = init_with_log_file(profile, &path) {
                init(profile);
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Cannot open log file, logging to stderr only"
                );
            }
        }
        None => init(profile),
    }
}
