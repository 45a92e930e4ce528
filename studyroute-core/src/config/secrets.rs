//! Secret handling for provider credentials
//!
//! Credentials travel through the router wrapped in [`SecretString`], which
//! never prints its value through `Display` or `Debug`.

use std::fmt;

/// API key that only leaves its wrapper through [`SecretString::expose_secret`]
#[derive(Clone)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Raw value, for attaching to an outgoing request
    pub fn expose_secret(&self) -> &str {
        &self.value
    }

    /// Empty or whitespace-only keys are treated as absent
    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
