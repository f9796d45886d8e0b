//! Config command: print the effective configuration

use crate::config::{self, Overrides};
use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct ShowConfigArgs {
    #[arg(long)]
    pub target: Option<String>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

pub fn execute(config_path: &Path, args: ShowConfigArgs) -> Result<i32> {
    let config = config::resolve(
        config_path,
        &Overrides {
            target: args.target,
            output_dir: args.output_dir,
        },
    )?;
    let text = toml::to_string_pretty(&config).context("failed to serialize config")?;
    print!("{}", text);
    Ok(0)
}
