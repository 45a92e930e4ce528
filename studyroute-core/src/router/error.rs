//! Caller-visible router errors

use crate::config::{env, ConfigError};
use crate::keys::KeyStoreError;
use crate::protocol::Provider;
use crate::providers::openrouter::DATA_POLICY_MISMATCH_DETAIL;
use crate::providers::TransportError;
use thiserror::Error;
use uuid::Uuid;

/// Errors returned by [`super::Router::execute`]
///
/// Transport and retry errors never cross this boundary. Unavailable and
/// rejected calls carry a message safe to show to end users; the underlying
/// cause is logged.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("LLM routing is misconfigured: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Missing API key for provider {provider}.")]
    MissingCredential { provider: Provider },

    #[error("Failed to read API key for provider {provider}: {source}")]
    KeyStore {
        provider: Provider,
        #[source]
        source: KeyStoreError,
    },

    #[error("LLM output failed schema validation.")]
    SchemaInvalid {
        call_id: Uuid,
        repair_prompt: String,
        diagnostics: String,
        invalid_output: String,
    },

    #[error("LLM service is temporarily unavailable. Please try again later.")]
    ProviderUnavailable { call_id: Uuid, provider: Provider },

    #[error("{message}")]
    ProviderRejected {
        call_id: Uuid,
        provider: Provider,
        message: String,
    },
}

impl RouterError {
    /// Invocation id, for errors raised after the transport stage was reached
    pub fn call_id(&self) -> Option<Uuid> {
        match self {
            RouterError::SchemaInvalid { call_id, .. }
            | RouterError::ProviderUnavailable { call_id, .. }
            | RouterError::ProviderRejected { call_id, .. } => Some(*call_id),
            _ => None,
        }
    }
}

/// User-facing message for a request the provider refused
pub fn rejected_message(provider: Provider, error: &TransportError) -> String {
    let detail = error.to_string().to_lowercase();
    if provider == Provider::OpenRouter && detail.contains(DATA_POLICY_MISMATCH_DETAIL) {
        return format!(
            "OpenRouter rejected the request because of the privacy policy for the selected model. \
             Open https://openrouter.ai/settings/privacy and enable free model publication, \
             or choose another model via {}.",
            env::OPENROUTER_MODEL_ENV_VAR
        );
    }
    "LLM request was rejected by the provider. Check the model and API key.".to_string()
}
