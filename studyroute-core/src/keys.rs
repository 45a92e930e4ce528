//! Provider credential lookup
//!
//! The router asks a [`KeyStore`] for the credential of the provider it is
//! about to call. A missing credential is an ordinary outcome (`Ok(None)`);
//! errors are reserved for backend failures.

use crate::config::SecretString;
use crate::protocol::Provider;
use std::collections::HashMap;
use std::env;
use std::sync::RwLock;
use thiserror::Error;

/// Environment variable holding the Anthropic API key
pub const ANTHROPIC_API_KEY_ENV_VAR: &str = "ANTHROPIC_API_KEY";

/// Environment variable holding the OpenRouter API key
pub const OPENROUTER_API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";

/// Errors raised by a key store backend
#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("API key for {provider} must not be blank")]
    BlankKey { provider: Provider },

    #[error("key store is read-only")]
    ReadOnly,

    #[error("key store backend failed: {message}")]
    Backend { message: String },
}

/// Port resolving provider API credentials
pub trait KeyStore: Send + Sync {
    /// Credential for `provider`, if one is stored
    fn get_key(&self, provider: Provider) -> Result<Option<SecretString>, KeyStoreError>;

    /// Store or replace the credential for `provider`
    fn set_key(&self, provider: Provider, key: SecretString) -> Result<(), KeyStoreError>;

    /// Remove the credential for `provider`; removing an absent key is not an error
    fn delete_key(&self, provider: Provider) -> Result<(), KeyStoreError>;
}

/// Process-local key store
#[derive(Debug, Default)]
pub struct InMemoryKeyStore {
    keys: RwLock<HashMap<Provider, SecretString>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert used when wiring a router
    pub fn with_key(self, provider: Provider, key: impl Into<SecretString>) -> Self {
        if let Ok(mut keys) = self.keys.write() {
            keys.insert(provider, key.into());
        }
        self
    }

    fn poisoned() -> KeyStoreError {
        KeyStoreError::Backend {
            message: "key map lock poisoned".to_string(),
        }
    }
}

impl KeyStore for InMemoryKeyStore {
    fn get_key(&self, provider: Provider) -> Result<Option<SecretString>, KeyStoreError> {
        let keys = self.keys.read().map_err(|_| Self::poisoned())?;
        Ok(keys.get(&provider).filter(|key| !key.is_blank()).cloned())
    }

    fn set_key(&self, provider: Provider, key: SecretString) -> Result<(), KeyStoreError> {
        if key.is_blank() {
            return Err(KeyStoreError::BlankKey { provider });
        }
        let mut keys = self.keys.write().map_err(|_| Self::poisoned())?;
        keys.insert(provider, SecretString::new(key.expose_secret().trim()));
        Ok(())
    }

    fn delete_key(&self, provider: Provider) -> Result<(), KeyStoreError> {
        let mut keys = self.keys.write().map_err(|_| Self::poisoned())?;
        keys.remove(&provider);
        Ok(())
    }
}

/// Read-only key store backed by process environment variables
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvKeyStore;

impl EnvKeyStore {
    pub fn new() -> Self {
        Self
    }

    /// Environment variable consulted for a provider
    pub fn env_var(provider: Provider) -> &'static str {
        match provider {
            Provider::Anthropic => ANTHROPIC_API_KEY_ENV_VAR,
            Provider::OpenRouter => OPENROUTER_API_KEY_ENV_VAR,
        }
    }
}

impl KeyStore for EnvKeyStore {
    fn get_key(&self, provider: Provider) -> Result<Option<SecretString>, KeyStoreError> {
        Ok(env::var(Self::env_var(provider))
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(SecretString::new))
    }

    fn set_key(&self, _provider: Provider, _key: SecretString) -> Result<(), KeyStoreError> {
        Err(KeyStoreError::ReadOnly)
    }

    fn delete_key(&self, _provider: Provider) -> Result<(), KeyStoreError> {
        Err(KeyStoreError::ReadOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_round_trip() {
        let store = InMemoryKeyStore::new();
        assert!(store.get_key(Provider::Anthropic).unwrap().is_none());

        store
            .set_key(Provider::Anthropic, SecretString::new("  sk-ant-123  "))
            .unwrap();
        let key = store.get_key(Provider::Anthropic).unwrap().unwrap();
        assert_eq!(key.expose_secret(), "sk-ant-123");
        assert!(store.get_key(Provider::OpenRouter).unwrap().is_none());

        store.delete_key(Provider::Anthropic).unwrap();
        store.delete_key(Provider::Anthropic).unwrap();
        assert!(store.get_key(Provider::Anthropic).unwrap().is_none());
    }

    #[test]
    fn test_blank_keys_are_rejected_and_hidden() {
        let store = InMemoryKeyStore::new();
        assert!(matches!(
            store.set_key(Provider::OpenRouter, SecretString::new("   ")),
            Err(KeyStoreError::BlankKey { .. })
        ));

        let store = InMemoryKeyStore::new().with_key(Provider::OpenRouter, "  ");
        assert!(store.get_key(Provider::OpenRouter).unwrap().is_none());
    }

    #[test]
    fn test_env_store_is_read_only() {
        let store = EnvKeyStore::new();
        assert!(matches!(
            store.set_key(Provider::Anthropic, SecretString::new("x")),
            Err(KeyStoreError::ReadOnly)
        ));
        assert_eq!(EnvKeyStore::env_var(Provider::OpenRouter), "OPENROUTER_API_KEY");
    }
}
