//! Mutual-TLS client context built from in-memory wallet material.

use pkcs8::der::pem::{self, LineEnding};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore, SupportedProtocolVersion};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::fmt;
use std::sync::Arc;
use tracing::info;
use zeroize::Zeroizing;

use super::crypto::install_default_provider;
use super::keystore::{load_key_store, load_trust_store};
use crate::config::TlsMinVersion;
use crate::errors::{Result, TlsError};
use crate::secrets::SecretString;

/// A client TLS context that presents a client certificate and verifies the
/// server against the configured CAs.
///
/// Holds a validated rustls [`ClientConfig`] plus PEM encodings of the same
/// material for drivers that take PEM. The [`ClientConfig`] trusts only the
/// configured CAs and enforces the minimum protocol version. The private key
/// PEM is zeroed on drop.
#[derive(Clone)]
pub struct TlsContext {
    client_config: Arc<ClientConfig>,
    client_cert_chain_pem: String,
    client_key_pem: Zeroizing<String>,
    root_certs_pem: String,
    chain_len: usize,
    trust_anchor_count: usize,
    min_version: TlsMinVersion,
}

impl TlsContext {
    /// The rustls client configuration
    pub fn client_config(&self) -> Arc<ClientConfig> {
        self.client_config.clone()
    }

    /// Number of certificates presented to the server
    pub fn chain_len(&self) -> usize {
        self.chain_len
    }

    /// Number of CA certificates trusted
    pub fn trust_anchor_count(&self) -> usize {
        self.trust_anchor_count
    }

    pub fn min_version(&self) -> TlsMinVersion {
        self.min_version
    }

    /// Attach the client identity and trust anchors to Postgres connection
    /// options and require full server verification.
    ///
    /// sqlx builds its own rustls configuration from these PEM copies. It adds
    /// the configured CAs to its bundled public roots rather than replacing
    /// them, and offers TLS 1.2 and 1.3. Host name verification still applies.
    /// A TLS 1.3 minimum is rejected during configuration validation for this
    /// reason.
    pub fn apply_to(&self, options: PgConnectOptions) -> PgConnectOptions {
        options
            .ssl_mode(PgSslMode::VerifyFull)
            .ssl_client_cert_from_pem(self.client_cert_chain_pem.as_bytes())
            .ssl_client_key_from_pem(self.client_key_pem.as_bytes())
            .ssl_root_cert_from_pem(self.root_certs_pem.as_bytes().to_vec())
    }
}

impl fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsContext")
            .field("chain_len", &self.chain_len)
            .field("trust_anchor_count", &self.trust_anchor_count)
            .field("min_version", &self.min_version)
            .field("client_key", &"[REDACTED]")
            .finish()
    }
}

/// Builds a [`TlsContext`] from decoded key store and trust store bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TlsContextBuilder {
    min_version: TlsMinVersion,
}

impl TlsContextBuilder {
    pub fn new(min_version: TlsMinVersion) -> Self {
        Self { min_version }
    }

    /// Build the context.
    ///
    /// Without a key store there is nothing to present, so `Ok(None)` is returned
    /// and the driver keeps its default trust behavior. With a key store, both
    /// the key store password and a trust store are required.
    pub fn build(
        &self,
        key_store: Option<&[u8]>,
        trust_store: Option<&[u8]>,
        key_store_password: Option<&SecretString>,
    ) -> Result<Option<TlsContext>> {
        let Some(key_store) = key_store else {
            return Ok(None);
        };

        let provider = install_default_provider()?;
        let fips = provider.fips();

        let password = key_store_password.ok_or(TlsError::MissingKeyStorePassword)?;
        let trust_store = trust_store.ok_or(TlsError::MissingTrustStore)?;

        let identity = load_key_store(key_store, password)?;
        let roots = load_trust_store(trust_store)?;

        let mut root_store = RootCertStore::empty();
        for root in &roots {
            root_store.add(root.clone()).map_err(|source| TlsError::TrustAnchor { source })?;
        }

        let client_config = ClientConfig::builder_with_provider(provider)
            .with_protocol_versions(protocol_versions(self.min_version))
            .map_err(|source| TlsError::ProtocolVersions { source })?
            .with_root_certificates(root_store)
            .with_client_auth_cert(
                identity.chain.clone(),
                PrivateKeyDer::Pkcs8(identity.key.clone_key()),
            )
            .map_err(|source| TlsError::ClientCertificate { source })?;

        let context = TlsContext {
            client_config: Arc::new(client_config),
            client_cert_chain_pem: certificates_to_pem(&identity.chain, "client certificates")?,
            client_key_pem: Zeroizing::new(
                pem::encode_string("PRIVATE KEY", LineEnding::LF, identity.key.secret_pkcs8_der())
                    .map_err(|e| TlsError::Encoding {
                        what: "client private key",
                        reason: e.to_string(),
                    })?,
            ),
            root_certs_pem: certificates_to_pem(&roots, "trust store")?,
            chain_len: identity.chain.len(),
            trust_anchor_count: roots.len(),
            min_version: self.min_version,
        };

        info!(
            chain_len = context.chain_len,
            trust_anchors = context.trust_anchor_count,
            min_version = ?self.min_version,
            fips = fips,
            "Built TLS context from in-memory key material"
        );

        Ok(Some(context))
    }
}

static TLS12_AND_UP: &[&SupportedProtocolVersion] =
    &[&rustls::version::TLS13, &rustls::version::TLS12];
static TLS13_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS13];

fn protocol_versions(min_version: TlsMinVersion) -> &'static [&'static SupportedProtocolVersion] {
    match min_version {
        TlsMinVersion::Tls12 => TLS12_AND_UP,
        TlsMinVersion::Tls13 => TLS13_ONLY,
    }
}

fn certificates_to_pem(
    certificates: &[CertificateDer<'_>],
    what: &'static str,
) -> std::result::Result<String, TlsError> {
    let mut out = String::new();
    for certificate in certificates {
        let block = pem::encode_string("CERTIFICATE", LineEnding::LF, certificate.as_ref())
            .map_err(|e| TlsError::Encoding { what, reason: e.to_string() })?;
        out.push_str(&block);
    }
    Ok(out)
}
