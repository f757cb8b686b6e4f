//! Startup sequence for walletpool
//!
//! Runs the bootstrap once per process (or per pool re-initialization):
//! - installs the process crypto provider
//! - selects the secret retriever for the deployment stage
//! - resolves secret references, builds the TLS context and the pool
//!
//! Callers serialize pool (re)creation; nothing here is shared between runs.

use crate::config::AppConfig;
use crate::errors::Result;
use crate::observability::metrics;
use crate::secrets::{select_retriever, ResolvedDatabaseConfig};
use crate::storage::{ManagedConnectionFactory, ManagedDataSource};
use crate::tls::install_default_provider;
use tracing::{error, info};

/// Pool name used when none is configured
pub const DEFAULT_POOL_NAME: &str = "db";

/// Build the managed data source described by `config`.
pub async fn bootstrap_data_source(
    config: &AppConfig,
    pool_name: &str,
) -> Result<ManagedDataSource> {
    let result: Result<ManagedDataSource> = async {
        install_default_provider()?;
        let retriever = select_retriever(config.stage, &config.cloud).await?;

        ManagedConnectionFactory::new(config.database.clone())
            .with_retriever(retriever)
            .build(pool_name)
            .await
    }
    .await;

    match &result {
        Ok(data_source) => info!(
            stage = %config.stage,
            pool = %data_source.name(),
            kind = %data_source.kind(),
            tls_attached = data_source.tls_attached(),
            "Bootstrap completed"
        ),
        Err(e) => {
            metrics::record_bootstrap_failure(&config.stage.to_string(), e.kind());
            error!(stage = %config.stage, error = %e, kind = e.kind(), "Bootstrap failed");
        }
    }

    result
}

/// Resolve secret references only, without building TLS material or a pool.
pub async fn resolve_secrets(config: &AppConfig) -> Result<ResolvedDatabaseConfig> {
    let retriever = select_retriever(config.stage, &config.cloud).await?;
    ManagedConnectionFactory::new(config.database.clone()).with_retriever(retriever).resolve().await
}
