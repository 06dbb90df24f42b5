//! Configuration file loading.
//!
//! The lifecycle manager works without a config file; one is only needed
//! to deviate from the stock deployment.

use std::fs;
use std::path::Path;

use crate::domain::{AppConfig, AppError, Result};

/// Load configuration from `path`, or defaults when no path is given.
///
/// # Errors
/// Returns error if the file cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => load_config_from_file(path),
        None => Ok(AppConfig::default()),
    }
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read, parsed or fails validation.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })?;
    config.validate()?;

    tracing::debug!(path = %path.display(), service = %config.service.name, "Configuration loaded");
    Ok(config)
}
