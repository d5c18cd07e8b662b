//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

// Re-export library error types
pub use cutover_provider::{CredentialValidationError, ProviderError};
pub use cutover_toolbox::ToolboxError;

/// Core layer error type
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// No provider registered under this name
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    /// Plan failed validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Operation not allowed in the plan's current status
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Credential validation errors (structured, supports field level errors)
    #[error("{0}")]
    CredentialValidation(CredentialValidationError),

    /// serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Provider error (converting from library)
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// Toolbox error (converting from library)
    #[error("{0}")]
    Toolbox(#[from] ToolboxError),
}

impl CoreError {
    /// Whether it is expected behavior (user input, resource does not exist, etc.) is used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when returning `false`.
    /// **Please update this method simultaneously when new variants are added. **
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::ProviderNotFound(_)
            | Self::ValidationError(_)
            | Self::InvalidState(_)
            | Self::CredentialValidation(_) => true,
            Self::Provider(e) => e.is_expected(),
            Self::Toolbox(ToolboxError::ValidationError(_)) => true,
            Self::Toolbox(_) | Self::SerializationError(_) => false,
        }
    }
}

impl From<CredentialValidationError> for CoreError {
    fn from(e: CredentialValidationError) -> Self {
        Self::CredentialValidation(e)
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;
