//! Environment variable handling for configuration
//!
//! Covers `${VAR}` interpolation in configuration files, per-provider model
//! overrides, and the audit payload storage toggle.

use super::error::ConfigError;
use crate::protocol::Provider;
use regex::Regex;
use std::env;
use std::sync::LazyLock;

/// Overrides the model used for every Anthropic-routed task
pub const ANTHROPIC_MODEL_ENV_VAR: &str = "STUDYROUTE_ANTHROPIC_MODEL";

/// Overrides the model used for every OpenRouter-routed task
pub const OPENROUTER_MODEL_ENV_VAR: &str = "STUDYROUTE_OPENROUTER_MODEL";

/// Controls whether audit records keep raw model output and diagnostics
pub const AUDIT_STORE_OUTPUT_ENV_VAR: &str = "STUDYROUTE_LLM_AUDIT_STORE_OUTPUT";

/// Built-in model for Anthropic-routed tasks
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";

/// Built-in model for OpenRouter-routed tasks
pub const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-4o-mini";

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is a valid regex")
});

/// Interpolate environment variables in a configuration string
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut result = content.to_string();

    for cap in ENV_VAR_PATTERN.captures_iter(content) {
        let var_name = &cap[1];
        match env::var(var_name) {
            Ok(value) => {
                result = result.replace(&cap[0], &value);
            }
            Err(_) => {
                return Err(ConfigError::EnvVarNotFound {
                    var: var_name.to_string(),
                });
            }
        }
    }

    Ok(result)
}

/// Environment variable that overrides the model for a provider
pub fn model_env_var(provider: Provider) -> &'static str {
    match provider {
        Provider::Anthropic => ANTHROPIC_MODEL_ENV_VAR,
        Provider::OpenRouter => OPENROUTER_MODEL_ENV_VAR,
    }
}

/// Built-in model for a provider
pub fn default_model(provider: Provider) -> &'static str {
    match provider {
        Provider::Anthropic => DEFAULT_ANTHROPIC_MODEL,
        Provider::OpenRouter => DEFAULT_OPENROUTER_MODEL,
    }
}

/// Resolve the model for a provider from an override, ignoring blank values
pub fn resolve_model(provider: Provider, raw_override: Option<String>) -> String {
    raw_override
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default_model(provider).to_string())
}

/// Resolve the model for a provider from the process environment
pub fn model_from_env(provider: Provider) -> String {
    resolve_model(provider, env::var(model_env_var(provider)).ok())
}

/// Interpret the audit payload toggle; anything but an explicit "off" keeps it on
pub fn parse_store_output_flag(raw_value: Option<&str>) -> bool {
    match raw_value {
        None => true,
        Some(value) => !matches!(
            value.trim().to_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
    }
}

/// Read the audit payload toggle from the process environment
pub fn store_output_from_env() -> bool {
    parse_store_output_flag(env::var(AUDIT_STORE_OUTPUT_ENV_VAR).ok().as_deref())
}
