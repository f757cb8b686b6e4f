//! # Structured Logging
//!
//! Installs the global `tracing` subscriber. `RUST_LOG` wins over the configured
//! level when set.

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Returns `Ok(())` without changes when a subscriber is already installed.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = build_filter(&config.log_level)?;

    let installed = if config.json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().try_init()
    };

    if installed.is_err() {
        // Subscriber already set elsewhere (e.g. integration tests); ignore.
        return Ok(());
    }

    tracing::debug!(
        log_level = %config.log_level,
        json_logging = config.json_logging,
        "Logging initialized"
    );
    Ok(())
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level)).map_err(|e| {
        Error::config_with_source(format!("Invalid log filter '{}'", level), Box::new(e))
    })
}

/// Log configuration at startup
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        stage = %config.stage,
        database = %crate::storage::sanitize_url(&config.database.url),
        max_connections = config.database.max_connections,
        tls_min_version = ?config.database.tls_min_version,
        metrics_port = config.observability.metrics_port,
        "walletpool configuration"
    );
}
