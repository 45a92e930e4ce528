//! Provider transport abstraction
//!
//! Each provider implements [`TransportClient`] over the provider-agnostic
//! [`TransportRequest`] / [`TransportResponse`] pair. Both are created per
//! attempt and never persisted.

use crate::config::SecretString;
use crate::protocol::Provider;
use crate::providers::error::TransportResult;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;

/// Provider-agnostic description of one generation attempt
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Model name understood by the provider
    pub model: String,
    /// Credential attached to the request
    pub api_key: SecretString,
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    /// Deadline for the whole HTTP exchange
    pub timeout: Duration,
}

/// Text output and usage extracted from a provider response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub output_text: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// Client able to run one generation against a single provider
#[async_trait]
pub trait TransportClient: Send + Sync {
    /// Provider this client talks to
    fn provider(&self) -> Provider;

    /// Perform one HTTP generation call
    async fn generate(&self, request: &TransportRequest) -> TransportResult<TransportResponse>;
}

/// Read input/output token counts from a usage object
///
/// Counts are kept only when they are non-negative JSON integers.
pub fn extract_usage_tokens(
    usage: Option<&Value>,
    input_key: &str,
    output_key: &str,
) -> (Option<u64>, Option<u64>) {
    match usage {
        Some(Value::Object(usage)) => (
            read_token_count(usage, input_key),
            read_token_count(usage, output_key),
        ),
        _ => (None, None),
    }
}

fn read_token_count(usage: &Map<String, Value>, key: &str) -> Option<u64> {
    usage.get(key).and_then(Value::as_u64)
}
