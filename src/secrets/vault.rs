//! Cloud secret manager backend using the instance's ambient identity.
//!
//! No credential is embedded in configuration. Application Default Credentials
//! pick the identity: `GOOGLE_APPLICATION_CREDENTIALS` when set, otherwise the
//! compute metadata server's default service account. The *current* version of
//! each secret is read through the Secret Manager API client.
//!
//! # Reference Format
//!
//! - Short form: `db-password` (uses `cloud.project_id`, latest version)
//! - Full path: `projects/my-project/secrets/db-password` (latest version)
//! - Pinned: `projects/my-project/secrets/db-password/versions/7` (used as-is)

use async_trait::async_trait;
use google_secretmanager1::{hyper_rustls, hyper_util, SecretManager};
use tracing::{debug, error, info};
use yup_oauth2::authenticator::ApplicationDefaultCredentialsTypes;
use yup_oauth2::{
    ApplicationDefaultCredentialsAuthenticator, ApplicationDefaultCredentialsFlowOpts,
};
use zeroize::Zeroizing;

use super::error::{Result, SecretsError};
use super::retriever::SecretRetriever;
use super::types::SecretBytes;
use crate::config::CloudSecretsConfig;
use crate::errors::Error;
use crate::tls::install_default_provider;

const METADATA_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// Version alias the secret manager resolves to the current version.
const CURRENT_VERSION: &str = "latest";

type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;

/// Secret manager backend authenticated with the instance's ambient identity.
pub struct VaultSecretRetriever {
    hub: SecretManager<HttpsConnector>,
    endpoint: String,
    project_id: Option<String>,
}

impl std::fmt::Debug for VaultSecretRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSecretRetriever")
            .field("endpoint", &self.endpoint)
            .field("project_id", &self.project_id)
            .field("hub", &"[SecretManager]")
            .finish()
    }
}

impl VaultSecretRetriever {
    /// Create a retriever for the configured secret manager.
    ///
    /// Both endpoints come from configuration so the client can be pointed at a
    /// local stand-in. No request is made until the first secret is read.
    pub async fn new(config: CloudSecretsConfig) -> crate::Result<Self> {
        // The HTTP clients below take the process default provider.
        install_default_provider()?;

        let client =
            hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
                .build(
                    hyper_rustls::HttpsConnectorBuilder::new()
                        .with_native_roots()
                        .map_err(|e| {
                            Error::config_with_source(
                                "Failed to load native TLS roots",
                                Box::new(e),
                            )
                        })?
                        .https_or_http()
                        .enable_http1()
                        .enable_http2()
                        .build(),
                );

        let opts = ApplicationDefaultCredentialsFlowOpts {
            metadata_url: Some(format!(
                "{}{}",
                config.metadata_endpoint.trim_end_matches('/'),
                METADATA_TOKEN_PATH
            )),
        };
        let auth = match ApplicationDefaultCredentialsAuthenticator::builder(opts).await {
            ApplicationDefaultCredentialsTypes::InstanceMetadata(auth) => auth.build().await,
            ApplicationDefaultCredentialsTypes::ServiceAccount(auth) => auth.build().await,
        }
        .map_err(|e| {
            Error::config_with_source("Failed to build ambient identity authenticator", Box::new(e))
        })?;

        let mut hub = SecretManager::new(client, auth);
        let base_url = format!("{}/", config.secret_manager_endpoint.trim_end_matches('/'));
        hub.base_url(base_url.clone());
        hub.root_url(base_url);

        info!(
            endpoint = %config.secret_manager_endpoint,
            project_id = ?config.project_id,
            "Initialized secret manager backend"
        );

        Ok(Self {
            hub,
            endpoint: config.secret_manager_endpoint,
            project_id: config.project_id,
        })
    }
}

/// Build the secret version resource name for an identifier.
///
/// - `db-password` -> `projects/{project}/secrets/db-password/versions/latest`
/// - `projects/p/secrets/s` -> `projects/p/secrets/s/versions/latest`
/// - `projects/p/secrets/s/versions/3` -> unchanged
fn resource_name(project_id: Option<&str>, secret_id: &str) -> Result<String> {
    if secret_id.is_empty() {
        return Err(SecretsError::invalid_key(secret_id, "secret identifier is empty"));
    }

    if secret_id.starts_with("projects/") {
        if secret_id.contains("/versions/") {
            return Ok(secret_id.to_string());
        }
        return Ok(format!("{}/versions/{}", secret_id.trim_end_matches('/'), CURRENT_VERSION));
    }

    if secret_id.contains('/') {
        return Err(SecretsError::invalid_key(
            secret_id,
            "short secret names cannot contain '/'; use a full projects/... path",
        ));
    }

    let project_id = project_id.ok_or_else(|| {
        SecretsError::invalid_key(
            secret_id,
            "short secret name used but no cloud.project_id is configured",
        )
    })?;

    Ok(format!("projects/{}/secrets/{}/versions/{}", project_id, secret_id, CURRENT_VERSION))
}

/// HTTP status of a failed call, when the server answered.
fn http_status(err: &google_secretmanager1::Error) -> Option<u16> {
    match err {
        google_secretmanager1::Error::Failure(response) => Some(response.status().as_u16()),
        google_secretmanager1::Error::BadRequest(body) => {
            body["error"]["code"].as_u64().and_then(|code| u16::try_from(code).ok())
        }
        _ => None,
    }
}

fn access_error(secret_id: &str, err: google_secretmanager1::Error) -> SecretsError {
    match http_status(&err) {
        Some(404) => SecretsError::not_found(secret_id),
        Some(status) => {
            error!(secret_id = %secret_id, status, "Secret manager rejected request");
            SecretsError::retrieval_failed(
                secret_id,
                format!("secret manager returned {}", status),
            )
        }
        None => {
            error!(secret_id = %secret_id, error = %err, "Secret manager request failed");
            SecretsError::retrieval_failed(
                secret_id,
                format!("secret manager request failed: {}", err),
            )
        }
    }
}

#[async_trait]
impl SecretRetriever for VaultSecretRetriever {
    async fn retrieve_secret(&self, secret_id: &str) -> Result<SecretBytes> {
        let resource_name = resource_name(self.project_id.as_deref(), secret_id)?;

        debug!(
            secret_id = %secret_id,
            resource_name = %resource_name,
            "Fetching secret from secret manager"
        );

        let (_, version) = self
            .hub
            .projects()
            .secrets_versions_access(&resource_name)
            .doit()
            .await
            .map_err(|e| access_error(secret_id, e))?;

        // The client has already decoded the base64 payload.
        let data = version
            .payload
            .and_then(|payload| payload.data)
            .ok_or_else(|| SecretsError::retrieval_failed(secret_id, "secret has no payload"))?;

        Ok(Zeroizing::new(data))
    }

    fn backend_name(&self) -> &'static str {
        "vault"
    }
}
