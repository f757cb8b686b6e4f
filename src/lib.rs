//! # walletpool
//!
//! Bootstraps a mutually-authenticated database connection pool for a service
//! whose credentials and TLS wallet live in a secret store.
//!
//! ## Architecture
//!
//! ```text
//! AppConfig → SecretResolver → TrustMaterialDecoder → TlsContextBuilder → PoolingLayer
//!                  ↓                                        ↓
//!          SecretRetriever (file | vault)          process crypto provider
//! ```
//!
//! Any configuration value of the form `{SECRET}<id>` is replaced by the secret
//! the stage's retriever returns for `<id>`. The key store and trust store are
//! decoded from base64 in memory and never written to disk.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use walletpool::{config::load_config, startup::bootstrap_data_source, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = load_config(None)?;
//!     let data_source = bootstrap_data_source(&config, "db").await?;
//!     walletpool::storage::check_connection(&data_source).await
//! }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod observability;
pub mod secrets;
pub mod startup;
pub mod storage;
pub mod tls;

// Re-export commonly used types and traits
pub use config::{load_config, AppConfig};
pub use errors::{Error, Result};
pub use startup::bootstrap_data_source;
pub use storage::{ManagedConnectionFactory, ManagedDataSource};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
