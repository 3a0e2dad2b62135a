//! Configuration commands.

use std::path::Path;

use crate::config::DemoConfig;
use crate::error::{DemoError, DemoResult};

/// The effective configuration as TOML, headed by the file it came from.
pub fn dump(config: &DemoConfig, path: &Path) -> DemoResult<String> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| DemoError::config(format!("failed to serialize config: {}", e)))?;
    Ok(format!("# config.toml ({})\n{}", path.display(), toml_str.trim_end()))
}

/// Validates the configuration.
pub fn validate(config: &DemoConfig) -> DemoResult<String> {
    config.validate()?;
    Ok("Configuration is valid.".to_string())
}

/// The configuration file path.
pub fn path(path: &Path) -> String {
    format!("config: {}", path.display())
}
