//! Router configuration schema
//!
//! The configuration is loaded once at startup and is immutable afterwards.
//! Every field has a default, so an empty document is a valid configuration.

use crate::protocol::{Provider, TaskType};
use crate::providers::anthropic::DEFAULT_ANTHROPIC_BASE_URL;
use crate::providers::openrouter::DEFAULT_OPENROUTER_BASE_URL;
use crate::providers::retry::RetryPolicy;
use crate::providers::routing::{default_routes, Route};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Default per-call transport timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Root router configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Route overrides keyed by task type; unlisted tasks use the default route
    #[serde(default)]
    pub routes: HashMap<TaskType, Route>,

    /// Per-call transport timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry policy applied to every transport call
    #[serde(default)]
    pub retry_policy: RetryPolicy,

    /// Provider base URLs
    #[serde(default)]
    pub endpoints: ProviderEndpoints,

    /// Whether audit records keep output text and diagnostics; unset defers to the environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_output: Option<bool>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry_policy: RetryPolicy::default(),
            endpoints: ProviderEndpoints::default(),
            store_output: None,
        }
    }
}

impl RouterConfig {
    /// Complete route table: defaults overlaid with the configured routes
    pub fn route_table(&self) -> HashMap<TaskType, Route> {
        let mut table = default_routes();
        table.extend(self.routes.clone());
        table
    }

    /// Per-call transport timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Audit payload toggle, falling back to the environment when unset
    pub fn store_output(&self) -> bool {
        self.store_output
            .unwrap_or_else(super::env::store_output_from_env)
    }
}

/// Base URLs of the provider APIs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderEndpoints {
    #[serde(default = "default_anthropic_base_url")]
    pub anthropic: String,

    #[serde(default = "default_openrouter_base_url")]
    pub openrouter: String,
}

fn default_anthropic_base_url() -> String {
    DEFAULT_ANTHROPIC_BASE_URL.to_string()
}

fn default_openrouter_base_url() -> String {
    DEFAULT_OPENROUTER_BASE_URL.to_string()
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            anthropic: default_anthropic_base_url(),
            openrouter: default_openrouter_base_url(),
        }
    }
}

impl ProviderEndpoints {
    /// Base URL for a provider
    pub fn base_url(&self, provider: Provider) -> &str {
        match provider {
            Provider::Anthropic => &self.anthropic,
            Provider::OpenRouter => &self.openrouter,
        }
    }
}
