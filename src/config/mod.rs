//! # Configuration Management
//!
//! Layered configuration for walletpool: serde defaults, then an optional file
//! (YAML, TOML or JSON by extension), then `WALLETPOOL__` environment variables.
//!
//! ```text
//! WALLETPOOL__STAGE=cloud
//! WALLETPOOL__DATABASE__URL=postgres://db.internal:5432/app
//! WALLETPOOL__DATABASE__PASSWORD={SECRET}db-password
//! ```

pub mod settings;

pub use settings::{
    AppConfig, CloudSecretsConfig, DatabaseConfig, DeploymentStage, DriverFamily,
    ObservabilityConfig, TlsMinVersion,
};

use crate::Result;
use std::path::Path;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "WALLETPOOL";

/// Separator between nested keys in environment variable names
pub const ENV_SEPARATOR: &str = "__";

/// Load and validate configuration from an optional file plus the environment.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    load_config_with_env(path, None)
}

/// Same as [`load_config`] but reads overrides from `env` instead of the process
/// environment when given.
pub fn load_config_with_env(
    path: Option<&Path>,
    env: Option<config::Map<String, String>>,
) -> Result<AppConfig> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .source(env),
    );

    let app_config: AppConfig = builder.build()?.try_deserialize()?;
    app_config.validate()?;

    tracing::debug!(
        stage = %app_config.stage,
        config_file = ?path,
        "Configuration loaded"
    );

    Ok(app_config)
}
