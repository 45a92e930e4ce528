//! Configuration error types with detailed error reporting

use crate::protocol::{Provider, TaskType};
use thiserror::Error;

/// Main configuration error type with detailed context
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config from '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in '{path}' at line {}, column {}: {message}",
            .line.unwrap_or(0), .column.unwrap_or(0))]
    ParseError {
        path: String,
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Environment variable '{var}' not found")]
    EnvVarNotFound { var: String },

    #[error("Missing route for task type: {task_type}")]
    MissingRoute { task_type: TaskType },

    #[error("Policy violation for task {task_type}: expected {expected}, got {actual}")]
    PolicyViolation {
        task_type: TaskType,
        expected: Provider,
        actual: Provider,
    },

    #[error("Provider client is not configured: {provider}")]
    MissingTransport { provider: Provider },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Invalid configuration value, located by its field path
#[derive(Debug, Error)]
#[error("Validation failed at '{field_path}': {kind}")]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `retry_policy.max_attempts`
    pub field_path: String,
    pub kind: ValidationErrorKind,
}

/// What is wrong with the field
#[derive(Debug, Error)]
pub enum ValidationErrorKind {
    #[error("value out of range: {message}")]
    OutOfRange { message: String },

    #[error("invalid URL: {message}")]
    InvalidUrl { message: String },
}

impl ValidationError {
    pub fn new(field_path: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            field_path: field_path.into(),
            kind,
        }
    }

    /// Numeric or duration field outside its allowed range
    pub fn out_of_range(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            field_path,
            ValidationErrorKind::OutOfRange {
                message: message.into(),
            },
        )
    }

    /// Base URL that does not parse or uses a non-HTTP scheme
    pub fn invalid_url(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            field_path,
            ValidationErrorKind::InvalidUrl {
                message: message.into(),
            },
        )
    }
}
