//! Workflow errors

use crate::protocol::Provider;
use crate::router::RouterError;
use thiserror::Error;

/// Errors returned by the repair-loop workflows
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The command failed up-front validation
    #[error("invalid command: {message}")]
    InvalidCommand { message: String },

    #[error("No LLM API key found for {provider}. Save an API key and try again.")]
    MissingCredential { provider: Provider },

    /// The provider refused the request; the message is safe to display
    #[error("{message}")]
    Rejected { message: String },

    /// The provider could not be reached; the message is safe to display
    #[error("{message}")]
    Unavailable { message: String },

    #[error("LLM is not configured correctly: {message}")]
    Configuration { message: String },

    /// Every attempt produced output that failed validation
    #[error("The {workflow} could not produce a valid result after {attempts} attempts. Adjust the input and try again.")]
    Exhausted {
        workflow: &'static str,
        attempts: u32,
        /// Diagnostics of the final attempt
        diagnostics: String,
    },
}

impl WorkflowError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        WorkflowError::InvalidCommand {
            message: message.into(),
        }
    }

    /// Short machine-readable kind for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::InvalidCommand { .. } => "invalid_command",
            WorkflowError::MissingCredential { .. } => "missing_credential",
            WorkflowError::Rejected { .. } => "rejected",
            WorkflowError::Unavailable { .. } => "unavailable",
            WorkflowError::Configuration { .. } => "configuration",
            WorkflowError::Exhausted { .. } => "exhausted",
        }
    }
}

/// Translate a non-schema router failure
///
/// Schema failures are handled by the repair loop and never reach here.
impl From<RouterError> for WorkflowError {
    fn from(err: RouterError) -> Self {
        match err {
            RouterError::MissingCredential { provider } => {
                WorkflowError::MissingCredential { provider }
            }
            RouterError::ProviderRejected { message, .. } => WorkflowError::Rejected { message },
            err @ RouterError::ProviderUnavailable { .. } => WorkflowError::Unavailable {
                message: err.to_string(),
            },
            err @ (RouterError::Configuration(_) | RouterError::KeyStore { .. }) => {
                WorkflowError::Configuration {
                    message: err.to_string(),
                }
            }
            err @ RouterError::SchemaInvalid { .. } => WorkflowError::Exhausted {
                workflow: "request",
                attempts: 1,
                diagnostics: err.to_string(),
            },
        }
    }
}
