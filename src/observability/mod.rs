//! # Observability Infrastructure
//!
//! Structured logging and bootstrap metrics for walletpool.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, log_config_info};
pub use metrics::init_metrics;

use crate::config::ObservabilityConfig;
use crate::errors::Result;

/// Initialize logging, then the metrics exporter if enabled
pub fn init_observability(config: &ObservabilityConfig) -> Result<()> {
    init_logging(config)?;
    init_metrics(config)?;

    ::tracing::info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        metrics_enabled = config.metrics_port != 0,
        "Observability initialized successfully"
    );

    Ok(())
}
