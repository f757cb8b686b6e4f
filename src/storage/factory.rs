//! Managed connection factory.
//!
//! Runs the bootstrap sequence for one pool:
//!
//! ```text
//! DatabaseConfig -> resolve secrets -> decode stores -> TLS context
//!                -> connection options -> pooling layer -> kind check
//! ```
//!
//! Every step runs once, in order. Any failure aborts the build and nothing
//! partially configured is returned.

use sqlx::postgres::PgConnectOptions;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use super::pool::{
    sanitize_url, ConnectionSource, DataSourceKind, ManagedDataSource, PoolSettings,
    PoolingLayer, SqlxPoolingLayer,
};
use crate::config::{DatabaseConfig, DriverFamily};
use crate::errors::{Error, Result};
use crate::secrets::{ResolvedDatabaseConfig, SecretResolver, SecretRetriever};
use crate::tls::{TlsContext, TlsContextBuilder, TrustMaterial};

/// Builds a [`ManagedDataSource`] from configuration that may reference secrets.
///
/// ```rust,ignore
/// let data_source = ManagedConnectionFactory::new(config.database)
///     .with_retriever(retriever)
///     .build("db")
///     .await?;
/// ```
#[derive(Debug)]
pub struct ManagedConnectionFactory {
    config: DatabaseConfig,
    retriever: Option<Arc<dyn SecretRetriever>>,
    pooling_layer: Arc<dyn PoolingLayer>,
}

impl ManagedConnectionFactory {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config, retriever: None, pooling_layer: Arc::new(SqlxPoolingLayer) }
    }

    /// Set the secret retriever used for `{SECRET}` references. Required.
    pub fn with_retriever(mut self, retriever: Arc<dyn SecretRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Replace the default sqlx pooling layer.
    pub fn with_pooling_layer(mut self, pooling_layer: Arc<dyn PoolingLayer>) -> Self {
        self.pooling_layer = pooling_layer;
        self
    }

    /// Resolve secret references without building a pool.
    pub async fn resolve(self) -> Result<ResolvedDatabaseConfig> {
        let retriever = self.retriever.ok_or(Error::RetrieverRequired)?;
        Ok(SecretResolver::new(retriever).resolve(self.config).await?)
    }

    /// Run the full bootstrap sequence and return the pool.
    pub async fn build(self, name: &str) -> Result<ManagedDataSource> {
        let pooling_layer = self.pooling_layer.clone();
        let resolved = self.resolve().await?;
        let config = resolved.config();

        let settings = PoolSettings::from_config(config);
        settings.validate()?;
        config.validate_custom()?;

        let family = config.driver_family().ok_or_else(|| {
            Error::validation_field(
                format!("Unsupported database URL: {}", sanitize_url(&config.url)),
                "database.url",
            )
        })?;

        let (source, tls_context) = match family {
            DriverFamily::Postgres => {
                let material = TrustMaterial::from_resolved(&resolved)?;
                let tls_context = TlsContextBuilder::new(config.tls_min_version).build(
                    material.key_store(),
                    material.trust_store(),
                    resolved.key_store_password(),
                )?;
                let options = postgres_options(&resolved, name, tls_context.as_ref())?;
                (ConnectionSource::Postgres(Box::new(options)), tls_context)
            }
            DriverFamily::Sqlite => {
                if resolved.key_store_base64().is_some() || resolved.trust_store_base64().is_some()
                {
                    warn!(pool = %name, "Ignoring wallet material for SQLite data source");
                }
                (ConnectionSource::Url(config.url.clone()), None)
            }
        };

        let data_source = pooling_layer.build_pool(name, &settings, source).await?;

        let expected = DataSourceKind::from(family);
        if data_source.kind() != expected {
            return Err(Error::unexpected_data_source_kind(
                expected.to_string(),
                data_source.kind().to_string(),
            ));
        }

        let data_source = data_source.with_tls_attached(tls_context.is_some());
        info!(
            pool = %name,
            url = %sanitize_url(&config.url),
            kind = %data_source.kind(),
            tls_attached = data_source.tls_attached(),
            resolved_fields = ?resolved.resolved_fields(),
            "Managed data source ready"
        );

        Ok(data_source)
    }
}

/// Connection options carrying URL, user, password, session properties and TLS.
fn postgres_options(
    resolved: &ResolvedDatabaseConfig,
    name: &str,
    tls_context: Option<&TlsContext>,
) -> Result<PgConnectOptions> {
    let config = resolved.config();

    let mut options = PgConnectOptions::from_str(&config.url).map_err(|e| {
        Error::database(
            e,
            format!("Invalid Postgres connection string: {}", sanitize_url(&config.url)),
        )
    })?;

    if let Some(user) = config.user.as_deref() {
        options = options.username(user);
    }
    if let Some(password) = resolved.password() {
        options = options.password(password.expose_secret());
    }
    options = options.application_name(name);
    if !config.connection_properties.is_empty() {
        options = options.options(config.connection_properties.iter());
    }
    if let Some(tls_context) = tls_context {
        options = tls_context.apply_to(options);
    }

    Ok(options)
}
