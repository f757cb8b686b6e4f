//! Secret retrieval and `{SECRET}` reference resolution.
//!
//! Configuration fields that carry credentials or wallet material may hold either
//! a literal value or a reference of the form `{SECRET}<id>`. References are
//! resolved once at bootstrap through a single [`SecretRetriever`] chosen from the
//! deployment stage:
//!
//! - **local**: [`FileSecretRetriever`] treats the identifier as a file path
//! - **cloud**: `VaultSecretRetriever` reads the current version from the cloud
//!   secret manager using the instance's ambient identity (`gcp` feature)
//!
//! # Example
//!
//! ```rust,ignore
//! use walletpool::secrets::{select_retriever, SecretResolver};
//!
//! let retriever = select_retriever(config.stage, &config.cloud).await?;
//! let resolved = SecretResolver::new(retriever).resolve(config.database).await?;
//! ```

pub mod error;
pub mod file;
pub mod resolver;
pub mod retriever;
pub mod types;
#[cfg(feature = "gcp")]
pub mod vault;

pub use error::SecretsError;
pub use file::FileSecretRetriever;
pub use resolver::{ResolvedDatabaseConfig, SecretReference, SecretResolver, SECRET_PREFIX};
pub use retriever::{select_retriever, SecretRetriever};
pub use types::{SecretBytes, SecretString};
#[cfg(feature = "gcp")]
pub use vault::VaultSecretRetriever;
