//! Common test utilities for all integration tests.
//!
//! Generates a throwaway certificate authority, a server identity and a client
//! key store protected by a password, the same shape a real wallet export has.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use base64::Engine;
use pkcs8::der::pem::LineEnding;
use pkcs8::pkcs5::pbes2;
use pkcs8::PrivateKeyInfo;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyPair,
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig, SupportedProtocolVersion};

/// Password protecting the generated client key
pub const KEY_STORE_PASSWORD: &str = "correct-horse-battery-staple";

/// DNS name in the generated server certificate
pub const SERVER_NAME: &str = "db.walletpool.test";

/// IP address in the generated server certificate, for loopback listeners
pub const SERVER_IP: &str = "127.0.0.1";

const PBKDF2_ITERATIONS: u32 = 2048;
const PBKDF2_SALT: [u8; 16] = *b"walletpool-salt!";
const AES_IV: [u8; 16] = *b"walletpool-iv-16";

struct Authority {
    cert: Certificate,
    key: KeyPair,
}

impl Authority {
    fn new(common_name: &str) -> anyhow::Result<Self> {
        let mut params = CertificateParams::new(Vec::<String>::new()).context("ca params")?;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.distinguished_name.push(DnType::CommonName, common_name);

        let key = KeyPair::generate().context("generate ca key")?;
        let cert = params.self_signed(&key).context("self-sign ca")?;
        Ok(Self { cert, key })
    }

    fn issue(
        &self,
        common_name: &str,
        san: Vec<String>,
        usage: ExtendedKeyUsagePurpose,
    ) -> anyhow::Result<(Certificate, KeyPair)> {
        let mut params = CertificateParams::new(san).context("leaf params")?;
        params.distinguished_name.push(DnType::CommonName, common_name);
        params.extended_key_usages = vec![usage];

        let key = KeyPair::generate().context("generate leaf key")?;
        let cert = params.signed_by(&key, &self.cert, &self.key).context("sign leaf")?;
        Ok((cert, key))
    }
}

/// Wallet material for one client plus the server it talks to.
pub struct TestWallet {
    pub ca_cert_pem: String,
    pub ca_cert_der: CertificateDer<'static>,
    pub server_cert_der: CertificateDer<'static>,
    server_key_der: Vec<u8>,
    pub client_cert_pem: String,
    pub client_cert_der: CertificateDer<'static>,
    client_key_pem: String,
    pub key_store_pem: String,
}

impl TestWallet {
    /// Generate a CA, a server certificate and an encrypted client key store.
    pub fn generate(password: &str) -> anyhow::Result<Self> {
        let ca = Authority::new("walletpool test ca")?;
        let (server_cert, server_key) = ca.issue(
            "walletpool test server",
            vec![SERVER_NAME.to_string(), SERVER_IP.to_string()],
            ExtendedKeyUsagePurpose::ServerAuth,
        )?;
        let (client_cert, client_key) =
            ca.issue("walletpool test client", Vec::new(), ExtendedKeyUsagePurpose::ClientAuth)?;

        let encrypted_key = encrypt_key(&client_key.serialize_der(), password)?;
        let key_store_pem = format!("{}{}", client_cert.pem(), encrypted_key);

        Ok(Self {
            ca_cert_pem: ca.cert.pem(),
            ca_cert_der: ca.cert.der().clone(),
            server_cert_der: server_cert.der().clone(),
            server_key_der: server_key.serialize_der(),
            client_cert_pem: client_cert.pem(),
            client_cert_der: client_cert.der().clone(),
            client_key_pem: client_key.serialize_pem(),
            key_store_pem,
        })
    }

    pub fn server_key(&self) -> PrivateKeyDer<'static> {
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.server_key_der.clone()))
    }

    /// Server config that requires a client certificate issued by this wallet's CA.
    pub fn server_config(
        &self,
        versions: &[&'static SupportedProtocolVersion],
    ) -> anyhow::Result<Arc<ServerConfig>> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());

        let mut roots = RootCertStore::empty();
        roots.add(self.ca_cert_der.clone())?;
        let verifier =
            WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider.clone())
                .build()?;

        let config = ServerConfig::builder_with_provider(provider)
            .with_protocol_versions(versions)?
            .with_client_cert_verifier(verifier)
            .with_single_cert(vec![self.server_cert_der.clone()], self.server_key())?;
        Ok(Arc::new(config))
    }

    /// Key store as it would be stored in the secret backend
    pub fn key_store_base64(&self) -> String {
        encode(&self.key_store_pem)
    }

    /// Trust store as it would be stored in the secret backend
    pub fn trust_store_base64(&self) -> String {
        encode(&self.ca_cert_pem)
    }

    /// A key store whose private key is not encrypted
    pub fn plaintext_key_store_pem(&self) -> String {
        format!("{}{}", self.client_cert_pem, self.client_key_pem)
    }

    /// Write each secret to its own file, the layout the file backend reads.
    pub fn write_secret_files(&self, dir: &Path, password: &str) -> anyhow::Result<SecretFiles> {
        let files = SecretFiles {
            key_store: dir.join("key_store.b64"),
            key_store_password: dir.join("key_store_password"),
            trust_store: dir.join("trust_store.b64"),
        };

        std::fs::write(&files.key_store, self.key_store_base64()).context("write key store")?;
        std::fs::write(&files.key_store_password, password).context("write password")?;
        std::fs::write(&files.trust_store, self.trust_store_base64())
            .context("write trust store")?;

        Ok(files)
    }
}

/// Paths written by [`TestWallet::write_secret_files`].
pub struct SecretFiles {
    pub key_store: PathBuf,
    pub key_store_password: PathBuf,
    pub trust_store: PathBuf,
}

/// `{SECRET}` reference to a path
pub fn secret_ref(path: &Path) -> String {
    format!("{{SECRET}}{}", path.display())
}

pub fn encode(value: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(value)
}

fn encrypt_key(pkcs8_der: &[u8], password: &str) -> anyhow::Result<String> {
    let info = PrivateKeyInfo::try_from(pkcs8_der).map_err(|e| anyhow!("parse key: {e}"))?;
    let params =
        pbes2::Parameters::pbkdf2_sha256_aes256cbc(PBKDF2_ITERATIONS, &PBKDF2_SALT, &AES_IV)
            .map_err(|e| anyhow!("pbes2 params: {e}"))?;

    let document = info
        .encrypt_with_params(params, password.as_bytes())
        .map_err(|e| anyhow!("encrypt key: {e}"))?;
    let pem = document
        .to_pem("ENCRYPTED PRIVATE KEY", LineEnding::LF)
        .map_err(|e| anyhow!("encode key: {e}"))?;

    Ok((*pem).clone())
}
