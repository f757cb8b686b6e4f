//! # Configuration Settings
//!
//! Defines the configuration structure for walletpool.

use crate::errors::{Error, Result};
use crate::secrets::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Deployment stage, selects the secret backend
    pub stage: DeploymentStage,

    /// Database connection configuration
    #[validate(nested)]
    pub database: DatabaseConfig,

    /// Cloud secret manager configuration (used when `stage` is `cloud`)
    #[validate(nested)]
    pub cloud: CloudSecretsConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;

        self.database.validate_custom()?;
        if self.stage == DeploymentStage::Cloud {
            self.cloud.validate_endpoints()?;
        }

        Ok(())
    }
}

/// Where the process is running, which decides how secrets are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStage {
    /// Development host: secret identifiers are file paths.
    #[default]
    Local,
    /// Cloud instance: secrets come from the cloud secret manager.
    Cloud,
}

impl fmt::Display for DeploymentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentStage::Local => write!(f, "local"),
            DeploymentStage::Cloud => write!(f, "cloud"),
        }
    }
}

/// Database driver family, derived from the connection URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverFamily {
    /// `postgres://` or `postgresql://`; TLS material is attached explicitly.
    Postgres,
    /// `sqlite:`; the URL is the whole connection description.
    Sqlite,
}

impl DriverFamily {
    /// Detect the driver family from a connection URL.
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(DriverFamily::Postgres)
        } else if url.starts_with("sqlite:") {
            Some(DriverFamily::Sqlite)
        } else {
            None
        }
    }

    /// Whether connections of this family take an explicit TLS context.
    pub fn needs_tls_context(&self) -> bool {
        matches!(self, DriverFamily::Postgres)
    }
}

impl fmt::Display for DriverFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverFamily::Postgres => write!(f, "postgres"),
            DriverFamily::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Minimum TLS protocol version offered to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TlsMinVersion {
    #[default]
    #[serde(rename = "1.2", alias = "tls1.2")]
    Tls12,
    #[serde(rename = "1.3", alias = "tls1.3")]
    Tls13,
}

/// Database configuration
///
/// `password`, `key_store_base64`, `key_store_password` and `trust_store_base64`
/// may each be a literal or a `{SECRET}<id>` reference.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Database user
    pub user: Option<String>,

    /// Database password
    pub password: Option<SecretString>,

    /// Base64 of the client key store (PEM chain plus encrypted PKCS#8 key)
    pub key_store_base64: Option<SecretString>,

    /// Password protecting the key store's private key
    pub key_store_password: Option<SecretString>,

    /// Base64 of the trust store (PEM CA certificates)
    pub trust_store_base64: Option<SecretString>,

    /// Maximum number of connections in the pool
    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[validate(range(min = 0, max = 50, message = "Min connections must be between 0 and 50"))]
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    #[validate(range(
        min = 1,
        max = 60,
        message = "Connect timeout must be between 1 and 60 seconds"
    ))]
    pub connect_timeout_seconds: u64,

    /// Idle timeout in seconds (0 = no timeout)
    pub idle_timeout_seconds: u64,

    /// Ping connections before handing them out
    pub test_before_acquire: bool,

    /// Extra driver properties, sent as session settings
    pub connection_properties: BTreeMap<String, String>,

    /// Minimum TLS version when a client key store is configured
    pub tls_min_version: TlsMinVersion,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/walletpool.db".to_string(),
            user: None,
            password: None,
            key_store_base64: None,
            key_store_password: None,
            trust_store_base64: None,
            max_connections: 10,
            min_connections: 0,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 600, // 10 minutes
            test_before_acquire: true,
            connection_properties: BTreeMap::new(),
            tls_min_version: TlsMinVersion::Tls12,
        }
    }
}

impl DatabaseConfig {
    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get idle timeout as Duration (None if 0)
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_seconds))
        }
    }

    /// Driver family of the configured URL
    pub fn driver_family(&self) -> Option<DriverFamily> {
        DriverFamily::from_url(&self.url)
    }

    /// Checks the validator crate cannot express
    pub fn validate_custom(&self) -> Result<()> {
        if self.driver_family().is_none() {
            return Err(Error::validation_field(
                "Database URL must start with 'postgres://', 'postgresql://' or 'sqlite:'",
                "database.url",
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(Error::validation_field(
                format!(
                    "Min connections ({}) cannot exceed max connections ({})",
                    self.min_connections, self.max_connections
                ),
                "database.min_connections",
            ));
        }

        // The Postgres driver negotiates TLS 1.2 or 1.3 and cannot be pinned to 1.3.
        if self.driver_family() == Some(DriverFamily::Postgres)
            && self.tls_min_version == TlsMinVersion::Tls13
        {
            return Err(Error::validation_field(
                "TLS 1.3 as a minimum is not supported for Postgres; use \"1.2\"",
                "database.tls_min_version",
            ));
        }

        Ok(())
    }
}

/// Cloud secret manager endpoints
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CloudSecretsConfig {
    /// Project used to expand short secret names
    pub project_id: Option<String>,

    /// Secret manager REST endpoint
    #[validate(length(min = 1, message = "Secret manager endpoint cannot be empty"))]
    pub secret_manager_endpoint: String,

    /// Compute metadata server providing the instance's ambient identity
    #[validate(length(min = 1, message = "Metadata endpoint cannot be empty"))]
    pub metadata_endpoint: String,
}

impl Default for CloudSecretsConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            secret_manager_endpoint: "https://secretmanager.googleapis.com".to_string(),
            metadata_endpoint: "http://metadata.google.internal".to_string(),
        }
    }
}

impl CloudSecretsConfig {
    fn validate_endpoints(&self) -> Result<()> {
        for (field, value) in [
            ("cloud.secret_manager_endpoint", &self.secret_manager_endpoint),
            ("cloud.metadata_endpoint", &self.metadata_endpoint),
        ] {
            let parsed = url::Url::parse(value).map_err(|e| {
                Error::validation_field(format!("Invalid endpoint '{}': {}", value, e), field)
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(Error::validation_field(
                    format!("Endpoint '{}' must use http or https", value),
                    field,
                ));
            }
        }
        Ok(())
    }
}

/// Observability configuration for logging and metrics
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,

    /// Prometheus exporter port (0 = disabled)
    pub metrics_port: u16,

    /// Service name attached to exported metrics
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logging: false,
            metrics_port: 0,
            service_name: "walletpool".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Get metrics bind address (None if disabled)
    pub fn metrics_bind_address(&self) -> Option<String> {
        if self.metrics_port == 0 {
            None
        } else {
            Some(format!("0.0.0.0:{}", self.metrics_port))
        }
    }
}
