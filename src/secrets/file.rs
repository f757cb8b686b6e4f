//! File-backed secrets for local and development deployments.
//!
//! The secret identifier is a filesystem path and the secret is the whole file.
//! There is no confidentiality beyond filesystem permissions, so this backend is
//! only selected for the `local` stage.

use async_trait::async_trait;
use std::io::ErrorKind;
use tracing::debug;
use zeroize::Zeroizing;

use super::error::{Result, SecretsError};
use super::retriever::SecretRetriever;
use super::types::SecretBytes;

/// Reads secrets from local files.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSecretRetriever;

#[async_trait]
impl SecretRetriever for FileSecretRetriever {
    async fn retrieve_secret(&self, secret_id: &str) -> Result<SecretBytes> {
        debug!(path = %secret_id, "Reading secret from file");

        match tokio::fs::read(secret_id).await {
            Ok(bytes) => Ok(Zeroizing::new(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(SecretsError::not_found(secret_id)),
            Err(e) => Err(SecretsError::retrieval_failed_with_source(
                secret_id,
                "failed to read secret file",
                e,
            )),
        }
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
