//! Error taxonomy for provider calls

use thiserror::Error;

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors a provider call can surface.
///
/// The taxonomy drives retry classification: only `Transient` participates in
/// the retry budget, everything else fails the call immediately.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Overload, timeout, or other fault expected to clear on its own
    #[error("Provider overloaded or unreachable: {0}")]
    Transient(String),

    /// The request itself was malformed
    #[error("Malformed request: {0}")]
    BadRequest(String),

    /// Credential rejected by the provider
    #[error("Invalid or expired credential")]
    AuthInvalid,

    /// The provider does not support the requested configuration
    #[error("Unsupported configuration: {0}")]
    Unsupported(String),
}

impl ProviderError {
    /// Whether a retry can plausibly change the outcome.
    pub fn is_retriable(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }

    /// Message recorded in the execution log and surfaced in agent status.
    pub fn user_message(&self) -> String {
        match self {
            ProviderError::Transient(detail) => {
                format!("The data provider is overloaded or unreachable ({detail}). Try again shortly.")
            }
            ProviderError::BadRequest(detail) => {
                format!("The request was rejected as malformed: {detail}")
            }
            ProviderError::AuthInvalid => {
                "The provider credential is invalid or expired. Update the credential and retry.".to_string()
            }
            ProviderError::Unsupported(detail) => {
                format!("The requested configuration is not supported: {detail}")
            }
        }
    }
}
