//! # Database Connection Pool Management
//!
//! The pooling layer takes an explicit connection source and pool settings and
//! returns a [`ManagedDataSource`]. The default [`SqlxPoolingLayer`] connects
//! lazily, so building a pool never touches the network.

use crate::config::{DatabaseConfig, DriverFamily};
use crate::errors::{Error, Result};
use crate::observability::metrics;
use async_trait::async_trait;
use sqlx::{
    pool::PoolOptions,
    postgres::{PgConnectOptions, PgPool},
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool},
    Database,
};
use std::{fmt, str::FromStr, time::Duration};

const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Pool sizing and lifecycle settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub test_before_acquire: bool,
}

impl PoolSettings {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            acquire_timeout: config.connect_timeout(),
            idle_timeout: config.idle_timeout(),
            test_before_acquire: config.test_before_acquire,
        }
    }

    /// Validate pool sizing
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(Error::validation("max_connections must be greater than 0"));
        }

        if self.min_connections > self.max_connections {
            return Err(Error::validation(
                "min_connections cannot be greater than max_connections",
            ));
        }

        Ok(())
    }

    fn pool_options<DB: Database>(&self) -> PoolOptions<DB> {
        PoolOptions::<DB>::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .test_before_acquire(self.test_before_acquire)
    }
}

/// How the pooling layer should open connections.
pub enum ConnectionSource {
    /// A connection URL, used as-is by the driver.
    Url(String),
    /// Fully built Postgres options (credentials and TLS material attached).
    Postgres(Box<PgConnectOptions>),
}

impl fmt::Debug for ConnectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionSource::Url(url) => f.debug_tuple("Url").field(&sanitize_url(url)).finish(),
            ConnectionSource::Postgres(options) => f
                .debug_struct("Postgres")
                .field("host", &options.get_host())
                .field("port", &options.get_port())
                .field("database", &options.get_database())
                .finish_non_exhaustive(),
        }
    }
}

/// Kind of pool behind a [`ManagedDataSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSourceKind {
    Postgres,
    Sqlite,
}

impl From<DriverFamily> for DataSourceKind {
    fn from(family: DriverFamily) -> Self {
        match family {
            DriverFamily::Postgres => DataSourceKind::Postgres,
            DriverFamily::Sqlite => DataSourceKind::Sqlite,
        }
    }
}

impl fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceKind::Postgres => write!(f, "postgres"),
            DataSourceKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// The concrete pool
#[derive(Debug, Clone)]
pub enum PoolHandle {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

/// A named, pooled data source ready for concurrent use.
#[derive(Debug, Clone)]
pub struct ManagedDataSource {
    name: String,
    pool: PoolHandle,
    tls_attached: bool,
}

impl ManagedDataSource {
    pub fn new(name: impl Into<String>, pool: PoolHandle) -> Self {
        Self { name: name.into(), pool, tls_attached: false }
    }

    pub(crate) fn with_tls_attached(mut self, tls_attached: bool) -> Self {
        self.tls_attached = tls_attached;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DataSourceKind {
        match self.pool {
            PoolHandle::Postgres(_) => DataSourceKind::Postgres,
            PoolHandle::Sqlite(_) => DataSourceKind::Sqlite,
        }
    }

    /// Whether an explicit client TLS context was attached to the connections
    pub fn tls_attached(&self) -> bool {
        self.tls_attached
    }

    pub fn pool(&self) -> &PoolHandle {
        &self.pool
    }

    pub fn as_postgres(&self) -> Option<&PgPool> {
        match &self.pool {
            PoolHandle::Postgres(pool) => Some(pool),
            PoolHandle::Sqlite(_) => None,
        }
    }

    pub fn as_sqlite(&self) -> Option<&SqlitePool> {
        match &self.pool {
            PoolHandle::Sqlite(pool) => Some(pool),
            PoolHandle::Postgres(_) => None,
        }
    }

    /// Get pool statistics for monitoring
    pub fn stats(&self) -> PoolStats {
        match &self.pool {
            PoolHandle::Postgres(pool) => PoolStats { size: pool.size(), idle: pool.num_idle() },
            PoolHandle::Sqlite(pool) => PoolStats { size: pool.size(), idle: pool.num_idle() },
        }
    }

    /// Close every connection in the pool
    pub async fn close(&self) {
        match &self.pool {
            PoolHandle::Postgres(pool) => pool.close().await,
            PoolHandle::Sqlite(pool) => pool.close().await,
        }
    }
}

/// Builds pools from a connection source.
#[async_trait]
pub trait PoolingLayer: Send + Sync + fmt::Debug {
    async fn build_pool(
        &self,
        name: &str,
        settings: &PoolSettings,
        source: ConnectionSource,
    ) -> Result<ManagedDataSource>;
}

/// Default pooling layer backed by sqlx pools.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlxPoolingLayer;

#[async_trait]
impl PoolingLayer for SqlxPoolingLayer {
    async fn build_pool(
        &self,
        name: &str,
        settings: &PoolSettings,
        source: ConnectionSource,
    ) -> Result<ManagedDataSource> {
        settings.validate()?;

        let pool = match source {
            ConnectionSource::Postgres(options) => {
                PoolHandle::Postgres(settings.pool_options().connect_lazy_with(*options))
            }
            ConnectionSource::Url(url) => match DriverFamily::from_url(&url) {
                Some(DriverFamily::Sqlite) => {
                    let options = SqliteConnectOptions::from_str(&url)
                        .map_err(|e| {
                            Error::database(
                                e,
                                format!("Invalid SQLite connection string: {}", sanitize_url(&url)),
                            )
                        })?
                        .create_if_missing(true)
                        .busy_timeout(SQLITE_BUSY_TIMEOUT)
                        .journal_mode(SqliteJournalMode::Wal);
                    PoolHandle::Sqlite(settings.pool_options().connect_lazy_with(options))
                }
                Some(DriverFamily::Postgres) => {
                    let options = PgConnectOptions::from_str(&url).map_err(|e| {
                        Error::database(
                            e,
                            format!("Invalid Postgres connection string: {}", sanitize_url(&url)),
                        )
                    })?;
                    PoolHandle::Postgres(settings.pool_options().connect_lazy_with(options))
                }
                None => {
                    return Err(Error::validation_field(
                        format!("Unsupported database URL: {}", sanitize_url(&url)),
                        "database.url",
                    ))
                }
            },
        };

        let data_source = ManagedDataSource::new(name, pool);
        metrics::record_pool_created(name, settings.max_connections);

        tracing::info!(
            pool = %name,
            database_type = %data_source.kind(),
            max_connections = settings.max_connections,
            min_connections = settings.min_connections,
            acquire_timeout_ms = settings.acquire_timeout.as_millis(),
            idle_timeout_ms = settings.idle_timeout.map(|d| d.as_millis()),
            "Database connection pool created"
        );

        Ok(data_source)
    }
}

/// Sanitize database URL for logging (remove credentials)
pub fn sanitize_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        if parsed.password().is_some() || !parsed.username().is_empty() {
            format!(
                "{}://***:***@{}{}",
                parsed.scheme(),
                parsed.host_str().unwrap_or("unknown"),
                parsed.path()
            )
        } else {
            url.to_string()
        }
    } else {
        url.to_string()
    }
}

/// Pool statistics for monitoring
#[derive(Debug, Clone)]
pub struct PoolStats {
    /// Total connections in the pool
    pub size: u32,
    /// Number of idle connections
    pub idle: usize,
}

impl PoolStats {
    /// Get the number of active connections
    pub fn active(&self) -> u32 {
        self.size.saturating_sub(self.idle as u32)
    }

    /// Check if the pool is healthy (has available connections)
    pub fn is_healthy(&self) -> bool {
        self.size > 0
    }
}
