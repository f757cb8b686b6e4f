//! # Error Types
//!
//! Crate-wide error type for the walletpool bootstrap sequence using `thiserror`.
//!
//! Every variant is fatal to bootstrap. Nothing here is retried internally; the
//! original cause is kept as the error source for diagnostics.

use crate::errors::TlsError;
use crate::secrets::SecretsError;

/// Custom result type for walletpool operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the walletpool bootstrap sequence
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// A secret backend could not produce a secret
    #[error(transparent)]
    Secrets(#[from] SecretsError),

    /// Base64 or key store encoding of wallet material is invalid
    #[error("Malformed key material in '{field}': {reason}")]
    MalformedKeyMaterial {
        field: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Key or trust material could not be turned into a TLS context
    #[error("TLS bootstrap failed: {0}")]
    TlsBootstrapFailed(#[from] TlsError),

    /// The connection factory was built without a secret retriever
    #[error("A secret retriever must be provided before building the data source")]
    RetrieverRequired,

    /// The pooling layer handed back a pool of a different kind than requested
    #[error("Expected a {expected} pool from the pooling layer but got {found}")]
    UnexpectedDataSourceKind { expected: String, found: String },

    /// Database and storage errors
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create a malformed key material error
    pub fn malformed_key_material<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        Self::MalformedKeyMaterial { field: field.into(), reason: reason.into(), source: None }
    }

    /// Create an unexpected data source kind error
    pub fn unexpected_data_source_kind<E: Into<String>, F: Into<String>>(
        expected: E,
        found: F,
    ) -> Self {
        Self::UnexpectedDataSourceKind { expected: expected.into(), found: found.into() }
    }

    /// Create a database error with context
    pub fn database<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::Database { source, context: context.into() }
    }

    /// Short, stable label for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config",
            Error::Validation { .. } => "validation",
            Error::Secrets(SecretsError::NotFound { .. }) => "secret_not_found",
            Error::Secrets(_) => "secret_retrieval_failed",
            Error::MalformedKeyMaterial { .. } => "malformed_key_material",
            Error::TlsBootstrapFailed(_) => "tls_bootstrap_failed",
            Error::RetrieverRequired => "retriever_required",
            Error::UnexpectedDataSourceKind { .. } => "unexpected_data_source_kind",
            Error::Database { .. } => "database",
            Error::Io { .. } => "io",
        }
    }

    /// Check if this error should be retried.
    ///
    /// Bootstrap fails closed: retrying with the same configuration and the same
    /// material cannot succeed, so nothing here is retryable.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<sqlx::Error> for Error {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "Database operation failed".to_string() }
    }
}

impl From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_creation() {
        let error = Error::config("missing stage");
        assert!(matches!(error, Error::Config { .. }));
        assert_eq!(error.to_string(), "Configuration error: missing stage");
    }

    #[test]
    fn test_validation_error_field() {
        let error = Error::validation_field("must be positive", "max_connections");
        if let Error::Validation { field, .. } = error {
            assert_eq!(field, Some("max_connections".to_string()));
        } else {
            panic!("expected validation error");
        }
    }

    #[test]
    fn test_secrets_error_is_transparent() {
        let error: Error = SecretsError::not_found("/run/secrets/db_pw").into();
        assert_eq!(error.to_string(), "Secret not found: /run/secrets/db_pw");
        assert_eq!(error.kind(), "secret_not_found");
    }

    #[test]
    fn test_tls_error_keeps_cause() {
        let error: Error = TlsError::MissingKeyStorePassword.into();
        assert_eq!(error.kind(), "tls_bootstrap_failed");
        assert!(error.to_string().starts_with("TLS bootstrap failed"));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_nothing_is_retryable() {
        assert!(!Error::RetrieverRequired.is_retryable());
        assert!(!Error::malformed_key_material("key_store_base64", "bad").is_retryable());
        assert!(!Error::unexpected_data_source_kind("postgres", "sqlite").is_retryable());
    }

    #[test]
    fn test_unexpected_kind_message() {
        let error = Error::unexpected_data_source_kind("postgres", "sqlite");
        assert_eq!(
            error.to_string(),
            "Expected a postgres pool from the pooling layer but got sqlite"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io { .. }));
    }
}
