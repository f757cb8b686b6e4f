//! # Metrics Collection
//!
//! Bootstrap metrics. The `metrics` macros are no-ops until a recorder is
//! installed, so recording is always safe to call.

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};
use ::tracing::info;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

pub const SECRETS_RESOLVED_TOTAL: &str = "walletpool_secrets_resolved_total";
pub const BOOTSTRAP_FAILURES_TOTAL: &str = "walletpool_bootstrap_failures_total";
pub const POOL_MAX_CONNECTIONS: &str = "walletpool_pool_max_connections";

/// Record a secret reference resolved through `backend`
pub fn record_secret_resolved(backend: &'static str) {
    counter!(SECRETS_RESOLVED_TOTAL, "backend" => backend).increment(1);
}

/// Record a failed bootstrap
pub fn record_bootstrap_failure(stage: &str, kind: &'static str) {
    let labels = [("stage", stage.to_string()), ("kind", kind.to_string())];
    counter!(BOOTSTRAP_FAILURES_TOTAL, &labels).increment(1);
}

/// Record the configured size of a newly created pool
pub fn record_pool_created(pool: &str, max_connections: u32) {
    let labels = [("pool", pool.to_string())];
    gauge!(POOL_MAX_CONNECTIONS, &labels).set(max_connections as f64);
}

fn describe_metrics() {
    describe_counter!(SECRETS_RESOLVED_TOTAL, "Secret references resolved at bootstrap");
    describe_counter!(BOOTSTRAP_FAILURES_TOTAL, "Bootstrap sequences that failed");
    describe_gauge!(POOL_MAX_CONNECTIONS, "Configured maximum connections per pool");
}

/// Initialize the Prometheus exporter when a metrics port is configured
pub fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    let Some(metrics_addr) = config.metrics_bind_address() else {
        return Ok(());
    };

    let socket_addr: SocketAddr = metrics_addr.parse().map_err(|e| {
        Error::config(format!("Invalid metrics bind address '{}': {}", metrics_addr, e))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(socket_addr)
        .add_global_label("service", &config.service_name)
        .install()
        .map_err(|e| Error::config(format!("Failed to initialize metrics exporter: {}", e)))?;

    describe_metrics();

    info!(
        metrics_addr = %metrics_addr,
        service_name = %config.service_name,
        "Metrics collection initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_exporter() {
        record_secret_resolved("file");
        record_bootstrap_failure("local", "secret_not_found");
        record_pool_created("db", 10);
    }

    #[test]
    fn test_init_metrics_disabled() {
        let config = ObservabilityConfig { metrics_port: 0, ..Default::default() };
        assert!(init_metrics(&config).is_ok());
    }
}
