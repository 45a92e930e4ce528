//! Configuration validation utilities

use super::error::{ConfigError, ValidationError};
use super::schema::RouterConfig;
use crate::protocol::Provider;
use crate::providers::routing::validate_routes;
use url::Url;

/// Configuration validator with cross-field rules
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self
    }

    /// Validate a configuration
    ///
    /// Route compliance failures surface as [`ConfigError::PolicyViolation`]
    /// or [`ConfigError::MissingRoute`]; everything else as a
    /// [`ValidationError`] with the offending field path.
    pub fn validate(&self, config: &RouterConfig) -> Result<(), ConfigError> {
        config.retry_policy.validate()?;
        self.validate_timeout(config)?;
        self.validate_endpoints(config)?;
        validate_routes(&config.route_table())?;
        Ok(())
    }

    fn validate_timeout(&self, config: &RouterConfig) -> Result<(), ValidationError> {
        if config.timeout_secs == 0 {
            return Err(ValidationError::out_of_range(
                "timeout_secs",
                "must be greater than 0",
            ));
        }
        Ok(())
    }

    fn validate_endpoints(&self, config: &RouterConfig) -> Result<(), ValidationError> {
        for provider in Provider::ALL {
            let field_path = format!("endpoints.{}", provider);
            let raw = config.endpoints.base_url(provider);

            let url = Url::parse(raw)
                .map_err(|e| ValidationError::invalid_url(field_path.clone(), e.to_string()))?;

            if !matches!(url.scheme(), "http" | "https") {
                return Err(ValidationError::invalid_url(
                    field_path,
                    format!("unsupported scheme '{}'", url.scheme()),
                ));
            }
        }
        Ok(())
    }
}
