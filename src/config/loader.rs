//! Configuration file loading and parsing.

use std::path::Path;

use super::model::AppConfig;
use crate::error::ConfigError;
use crate::validation::{report, validate_config};

/// Loads the configuration file from disk and parses it.
pub fn load_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    // An empty document deserializes as null; treat it as all defaults.
    if content.trim().is_empty() {
        return Ok(AppConfig::default());
    }

    let config: AppConfig =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    Ok(config)
}

/// Loads the configuration (defaults when `path` is `None`) and validates it.
pub fn load_and_validate(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let config = match path {
        Some(path) => load_from_path(path)?,
        None => AppConfig::default(),
    };

    let result = validate_config(&config);

    for issue in result.warnings() {
        tracing::warn!(
            path = %issue.path,
            message = %issue.message,
            suggestion = ?issue.suggestion,
            "Config validation warning"
        );
    }

    if !result.is_valid() {
        tracing::error!("{}", report::format_report(&result));
        return Err(ConfigError::ValidationFailed {
            error_count: result.error_count(),
        });
    }

    Ok(config)
}
