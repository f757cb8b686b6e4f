//! Secret retrieval capability and per-stage selection.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::error::Result;
use super::file::FileSecretRetriever;
use super::types::SecretBytes;
#[cfg(feature = "gcp")]
use super::vault::VaultSecretRetriever;
use crate::config::{CloudSecretsConfig, DeploymentStage};

/// Fetches a secret's raw bytes from a backend.
///
/// Exactly one retriever is active per process. It is built once from the
/// [`DeploymentStage`] by [`select_retriever`] and passed explicitly to whatever
/// needs it.
///
/// # Errors
///
/// - [`SecretsError::NotFound`](super::SecretsError::NotFound) if the identifier
///   does not exist in the backend
/// - [`SecretsError::RetrievalFailed`](super::SecretsError::RetrievalFailed) for
///   any I/O, network or authentication failure
///
/// Implementations never retry and never cache.
#[async_trait]
pub trait SecretRetriever: Send + Sync + std::fmt::Debug {
    /// Retrieve the raw bytes of the secret named by `secret_id`.
    async fn retrieve_secret(&self, secret_id: &str) -> Result<SecretBytes>;

    /// Backend identifier used in logs and metrics.
    fn backend_name(&self) -> &'static str;
}

/// Build the retriever for a deployment stage.
///
/// `local` reads secrets from files. `cloud` talks to the secret manager using
/// the instance's ambient identity and needs the `gcp` feature.
pub async fn select_retriever(
    stage: DeploymentStage,
    cloud: &CloudSecretsConfig,
) -> crate::Result<Arc<dyn SecretRetriever>> {
    let retriever: Arc<dyn SecretRetriever> = match stage {
        DeploymentStage::Local => Arc::new(FileSecretRetriever),
        DeploymentStage::Cloud => cloud_retriever(cloud).await?,
    };

    info!(stage = %stage, backend = retriever.backend_name(), "Initialized secret retriever");
    Ok(retriever)
}

#[cfg(feature = "gcp")]
async fn cloud_retriever(cloud: &CloudSecretsConfig) -> crate::Result<Arc<dyn SecretRetriever>> {
    Ok(Arc::new(VaultSecretRetriever::new(cloud.clone()).await?))
}

#[cfg(not(feature = "gcp"))]
async fn cloud_retriever(_cloud: &CloudSecretsConfig) -> crate::Result<Arc<dyn SecretRetriever>> {
    Err(crate::Error::config(
        "The cloud stage requires walletpool to be built with the `gcp` feature",
    ))
}
