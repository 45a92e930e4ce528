//! Configuration module for the router
//!
//! This module provides the configuration schema, validation, secret handling
//! and environment lookups. Configuration files may be YAML or JSON and may
//! reference environment variables as `${VAR}`.

pub mod env;
mod error;
mod schema;
mod secrets;
mod validator;

pub use error::{ConfigError, ValidationError, ValidationErrorKind};
pub use schema::{ProviderEndpoints, RouterConfig, DEFAULT_TIMEOUT_SECS};
pub use secrets::SecretString;
pub use validator::ConfigValidator;

use std::fs;
use std::path::Path;

fn read_config_file(path: &Path) -> Result<String, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;

    // Interpolate environment variables before parsing
    env::interpolate_env_vars(&content)
}

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<RouterConfig, ConfigError> {
    let path = path.as_ref();
    let interpolated = read_config_file(path)?;

    let config: RouterConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: e.location().map(|l| l.line()),
            column: e.location().map(|l| l.column()),
            message: e.to_string(),
        })?;

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<RouterConfig, ConfigError> {
    let path = path.as_ref();
    let interpolated = read_config_file(path)?;

    let config: RouterConfig =
        serde_json::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: Some(e.line()),
            column: Some(e.column()),
            message: e.to_string(),
        })?;

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

/// Load a configuration file, choosing the format from its extension
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<RouterConfig, ConfigError> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => load_from_json(path),
        Some("yaml") | Some("yml") => load_from_yaml(path),
        other => Err(ConfigError::Invalid {
            message: format!(
                "unsupported config file extension: {}",
                other.unwrap_or("<none>")
            ),
        }),
    }
}
