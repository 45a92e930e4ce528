//! Transport error taxonomy shared by every provider client

use crate::protocol::Provider;
use thiserror::Error;

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors that can occur when calling an LLM provider over HTTP
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// HTTP 429
    #[error("{message}")]
    RateLimited { provider: Provider, message: String },

    /// HTTP 5xx
    #[error("{message}")]
    ServerError {
        provider: Provider,
        status_code: u16,
        message: String,
    },

    /// Any other HTTP status >= 400; the request will not succeed as sent
    #[error("{message}")]
    Rejected {
        provider: Provider,
        status_code: u16,
        message: String,
    },

    /// The request did not complete within its timeout
    #[error("{provider} request timed out")]
    Timeout { provider: Provider },

    /// Connection could not be established or was interrupted
    #[error("{provider} connection failed: {message}")]
    Connection { provider: Provider, message: String },

    /// A 2xx response whose body does not have the expected shape
    #[error("{provider} returned an unusable response: {message}")]
    InvalidResponse { provider: Provider, message: String },
}

impl TransportError {
    /// Whether the failure is transient and worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::ServerError { .. } => true,
            Self::Timeout { .. } => true,
            Self::Connection { .. } => true,
            Self::Rejected { .. } => false,
            Self::InvalidResponse { .. } => false,
        }
    }

    /// Provider that produced the error
    pub fn provider(&self) -> Provider {
        match self {
            Self::RateLimited { provider, .. }
            | Self::ServerError { provider, .. }
            | Self::Rejected { provider, .. }
            | Self::Timeout { provider }
            | Self::Connection { provider, .. }
            | Self::InvalidResponse { provider, .. } => *provider,
        }
    }

    /// Short machine-readable kind for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::ServerError { .. } => "server_error",
            Self::Rejected { .. } => "rejected",
            Self::Timeout { .. } => "timeout",
            Self::Connection { .. } => "connection",
            Self::InvalidResponse { .. } => "invalid_response",
        }
    }

    /// Map a reqwest send/read failure
    pub fn from_reqwest(provider: Provider, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout { provider }
        } else if err.is_connect() {
            TransportError::Connection {
                provider,
                message: format!("Connection failed: {}", err),
            }
        } else if err.is_decode() || err.is_body() {
            TransportError::Connection {
                provider,
                message: format!("Failed to read response body: {}", err),
            }
        } else {
            TransportError::Connection {
                provider,
                message: err.to_string(),
            }
        }
    }

    pub(crate) fn invalid_response(provider: Provider, message: impl Into<String>) -> Self {
        TransportError::InvalidResponse {
            provider,
            message: message.into(),
        }
    }
}
