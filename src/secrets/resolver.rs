//! `{SECRET}` reference substitution for database configuration.
//!
//! A configuration string is a secret reference when it starts with
//! [`SECRET_PREFIX`]. Everything after the prefix is the opaque identifier handed
//! to the active [`SecretRetriever`]. Anything else passes through untouched.
//!
//! Resolution is a pure transform from [`DatabaseConfig`] to
//! [`ResolvedDatabaseConfig`]. The input is consumed, so the same configuration
//! cannot be resolved twice and the pool builder only accepts the resolved form.

use std::sync::Arc;
use tracing::debug;

use super::error::{Result, SecretsError};
use super::retriever::SecretRetriever;
use super::types::SecretString;
use crate::config::DatabaseConfig;
use crate::observability::metrics;

/// Sentinel marking a configuration value as a secret reference.
pub const SECRET_PREFIX: &str = "{SECRET}";

/// A configuration value that names a secret instead of holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretReference<'a> {
    secret_id: &'a str,
}

impl<'a> SecretReference<'a> {
    /// Parse a value, returning `None` when it is a plain literal.
    ///
    /// The prefix is matched case-sensitively at the very start of the value.
    /// No escaping exists, so a literal that happens to start with the prefix is
    /// always treated as a reference.
    pub fn parse(value: &'a str) -> Option<Self> {
        value.strip_prefix(SECRET_PREFIX).map(|secret_id| Self { secret_id })
    }

    /// The identifier passed to the retriever, exactly as written after the prefix.
    pub fn secret_id(&self) -> &'a str {
        self.secret_id
    }
}

/// Database configuration whose secret-bearing fields have been resolved.
///
/// Only [`SecretResolver::resolve`] can create one.
#[derive(Debug, Clone)]
pub struct ResolvedDatabaseConfig {
    config: DatabaseConfig,
    resolved_fields: Vec<&'static str>,
}

impl ResolvedDatabaseConfig {
    /// The configuration with every reference replaced by its secret value.
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Names of the fields that held a reference, in resolution order.
    pub fn resolved_fields(&self) -> &[&'static str] {
        &self.resolved_fields
    }

    pub fn password(&self) -> Option<&SecretString> {
        self.config.password.as_ref()
    }

    pub fn key_store_base64(&self) -> Option<&SecretString> {
        self.config.key_store_base64.as_ref()
    }

    pub fn key_store_password(&self) -> Option<&SecretString> {
        self.config.key_store_password.as_ref()
    }

    pub fn trust_store_base64(&self) -> Option<&SecretString> {
        self.config.trust_store_base64.as_ref()
    }
}

/// Applies the reference protocol using a single retriever.
#[derive(Debug, Clone)]
pub struct SecretResolver {
    retriever: Arc<dyn SecretRetriever>,
}

impl SecretResolver {
    pub fn new(retriever: Arc<dyn SecretRetriever>) -> Self {
        Self { retriever }
    }

    /// Resolve a single configuration value.
    ///
    /// - absent stays absent
    /// - a literal is returned unchanged and the retriever is not called
    /// - a reference is replaced by the UTF-8 text of the retrieved bytes
    pub async fn resolve_value(
        &self,
        value: Option<&SecretString>,
    ) -> Result<Option<SecretString>> {
        let Some(value) = value else {
            return Ok(None);
        };

        let Some(reference) = SecretReference::parse(value.expose_secret()) else {
            return Ok(Some(value.clone()));
        };

        let secret_id = reference.secret_id();
        let bytes = self.retriever.retrieve_secret(secret_id).await?;
        let resolved = SecretString::from_utf8(bytes).map_err(|e| {
            SecretsError::invalid_value(secret_id, format!("secret is not valid UTF-8: {}", e))
        })?;

        metrics::record_secret_resolved(self.retriever.backend_name());
        Ok(Some(resolved))
    }

    /// Resolve the secret-bearing fields of a database configuration.
    ///
    /// Fields are resolved one at a time in a fixed order: password, key store,
    /// key store password, trust store. The URL and user are never resolved.
    /// The first failure aborts resolution.
    pub async fn resolve(&self, mut config: DatabaseConfig) -> Result<ResolvedDatabaseConfig> {
        let mut resolved_fields = Vec::new();

        for (field, slot) in [
            ("password", &mut config.password),
            ("key_store_base64", &mut config.key_store_base64),
            ("key_store_password", &mut config.key_store_password),
            ("trust_store_base64", &mut config.trust_store_base64),
        ] {
            let is_reference = slot
                .as_ref()
                .is_some_and(|value| SecretReference::parse(value.expose_secret()).is_some());

            let value = self.resolve_value(slot.as_ref()).await?;
            *slot = value;

            if is_reference {
                debug!(
                    field = field,
                    backend = self.retriever.backend_name(),
                    "Resolved secret reference"
                );
                resolved_fields.push(field);
            }
        }

        Ok(ResolvedDatabaseConfig { config, resolved_fields })
    }
}
