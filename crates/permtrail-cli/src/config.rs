//! Config file loading for the CLI

use anyhow::{Context, Result};
use permtrail_core::config::AuditConfig;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "permtrail.toml";

/// Command-line values that take precedence over the file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub target: Option<String>,
    pub output_dir: Option<PathBuf>,
}

/// Read `path` as TOML; a missing file yields the defaults
pub fn load(path: &Path) -> Result<AuditConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        return Ok(AuditConfig::default());
    }

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse(&text).with_context(|| format!("invalid config file {}", path.display()))
}

pub fn parse(text: &str) -> Result<AuditConfig> {
    Ok(toml::from_str(text)?)
}

/// Load, apply overrides, validate
pub fn resolve(path: &Path, overrides: &Overrides) -> Result<AuditConfig> {
    let mut config = load(path)?;
    if let Some(target) = &overrides.target {
        config.target = target.clone();
    }
    if let Some(dir) = &overrides.output_dir {
        config.output_dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}
