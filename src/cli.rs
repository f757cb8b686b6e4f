//! # Command Line Interface
//!
//! Operator commands for checking a bootstrap end to end and for seeing which
//! configuration fields are sourced from the secret store. Secret values are
//! never printed.

use crate::config::{load_config, AppConfig};
use crate::observability::{init_observability, log_config_info};
use crate::secrets::ResolvedDatabaseConfig;
use crate::startup::{bootstrap_data_source, resolve_secrets, DEFAULT_POOL_NAME};
use crate::storage::{check_connection, sanitize_url};
use crate::tls::install_default_provider;
use crate::{APP_NAME, VERSION};
use clap::{Parser, Subcommand};
use std::fmt;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "walletpool")]
#[command(about = "Bootstrap a mutually-authenticated database pool from secret references")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (YAML, TOML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database URL override
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Name of the pool to build
    #[arg(long, global = true, default_value = DEFAULT_POOL_NAME)]
    pub pool_name: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the pool and run a connectivity check against it
    Check,

    /// Resolve secret references and report where each field came from
    Resolve,
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    // Load .env file if it exists (optional - won't fail if missing)
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    install_default_provider()?;

    let cli = Cli::parse();
    let config = load_cli_config(&cli)?;

    init_observability(&config.observability)?;
    info!(app_name = APP_NAME, version = VERSION, "Starting walletpool");
    log_config_info(&config);

    match cli.command {
        Commands::Check => handle_check(&config, &cli.pool_name).await?,
        Commands::Resolve => handle_resolve(&config).await?,
    }

    Ok(())
}

fn load_cli_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = load_config(cli.config.as_deref())?;

    if let Some(url) = &cli.database_url {
        config.database.url = url.clone();
        config.validate()?;
    }
    if cli.verbose {
        config.observability.log_level = "debug".to_string();
    }

    Ok(config)
}

async fn handle_check(config: &AppConfig, pool_name: &str) -> anyhow::Result<()> {
    let data_source = bootstrap_data_source(config, pool_name).await?;
    check_connection(&data_source).await?;

    let stats = data_source.stats();
    println!("Pool '{}' is ready", data_source.name());
    println!("  database:     {}", sanitize_url(&config.database.url));
    println!("  kind:         {}", data_source.kind());
    println!("  tls attached: {}", data_source.tls_attached());
    println!("  connections:  {} ({} idle)", stats.size, stats.idle);

    data_source.close().await;
    Ok(())
}

async fn handle_resolve(config: &AppConfig) -> anyhow::Result<()> {
    let resolved = resolve_secrets(config).await?;

    println!("{:<20} SOURCE", "FIELD");
    for (field, source) in field_sources(&resolved) {
        println!("{:<20} {}", field, source);
    }
    Ok(())
}

/// Where a secret-bearing field's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    SecretStore,
    Literal,
    Unset,
}

impl fmt::Display for FieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSource::SecretStore => write!(f, "secret store"),
            FieldSource::Literal => write!(f, "literal"),
            FieldSource::Unset => write!(f, "not set"),
        }
    }
}

/// Report the source of every secret-bearing field, in resolution order.
pub fn field_sources(resolved: &ResolvedDatabaseConfig) -> Vec<(&'static str, FieldSource)> {
    [
        ("password", resolved.password().is_some()),
        ("key_store_base64", resolved.key_store_base64().is_some()),
        ("key_store_password", resolved.key_store_password().is_some()),
        ("trust_store_base64", resolved.trust_store_base64().is_some()),
    ]
    .into_iter()
    .map(|(field, present)| {
        let source = if resolved.resolved_fields().contains(&field) {
            FieldSource::SecretStore
        } else if present {
            FieldSource::Literal
        } else {
            FieldSource::Unset
        };
        (field, source)
    })
    .collect()
}
