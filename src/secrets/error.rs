//! Error types for secret retrieval and resolution.

use thiserror::Error;

/// Result type for secrets operations.
pub type Result<T> = std::result::Result<T, SecretsError>;

/// Errors that can occur while fetching or resolving a secret.
///
/// Messages name the secret identifier, never the secret value.
#[derive(Error, Debug)]
pub enum SecretsError {
    /// Secret not found in the backend.
    #[error("Secret not found: {key}")]
    NotFound { key: String },

    /// The backend could not produce the secret (I/O, network, auth, decoding).
    #[error("Failed to retrieve secret '{key}': {message}")]
    RetrievalFailed {
        key: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid secret identifier for the selected backend.
    #[error("Invalid secret key: {key} - {reason}")]
    InvalidKey { key: String, reason: String },

    /// Secret value could not be used as configuration text.
    #[error("Invalid secret value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

impl SecretsError {
    /// Create a not found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a retrieval failure without an underlying cause.
    pub fn retrieval_failed(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RetrievalFailed { key: key.into(), message: message.into(), source: None }
    }

    /// Create a retrieval failure that keeps its underlying cause.
    pub fn retrieval_failed_with_source(
        key: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::RetrievalFailed {
            key: key.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid key error.
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into(), reason: reason.into() }
    }

    /// Create an invalid value error.
    pub fn invalid_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue { key: key.into(), reason: reason.into() }
    }

    /// The secret identifier this error refers to.
    pub fn key(&self) -> &str {
        match self {
            Self::NotFound { key }
            | Self::RetrievalFailed { key, .. }
            | Self::InvalidKey { key, .. }
            | Self::InvalidValue { key, .. } => key,
        }
    }
}
