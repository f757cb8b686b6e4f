//! # Storage and Persistence
//!
//! Builds the managed, TLS-capable connection pool and checks connectivity.

pub mod factory;
pub mod pool;

pub use crate::config::DatabaseConfig;

pub use factory::ManagedConnectionFactory;
pub use pool::{
    sanitize_url, ConnectionSource, DataSourceKind, ManagedDataSource, PoolHandle, PoolSettings,
    PoolStats, PoolingLayer, SqlxPoolingLayer,
};

use crate::errors::{Error, Result};

/// Check database connectivity
pub async fn check_connection(data_source: &ManagedDataSource) -> Result<()> {
    let result = match data_source.pool() {
        PoolHandle::Postgres(pool) => sqlx::query("SELECT 1").fetch_one(pool).await.map(|_| ()),
        PoolHandle::Sqlite(pool) => sqlx::query("SELECT 1").fetch_one(pool).await.map(|_| ()),
    };

    result.map_err(|e| Error::Database {
        source: e,
        context: format!("Database connectivity check failed for pool '{}'", data_source.name()),
    })
}
