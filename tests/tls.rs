//! TLS context tests against a real mutual-TLS handshake.
//!
//! The server side is plain tokio-rustls over an in-memory duplex pipe, so no
//! sockets or database are involved.

mod common;

use std::sync::Arc;

use common::{TestWallet, KEY_STORE_PASSWORD, SERVER_NAME};
use rustls::pki_types::ServerName;
use rustls::{ProtocolVersion, ServerConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_rustls::{TlsAcceptor, TlsConnector};
use walletpool::config::TlsMinVersion;
use walletpool::errors::TlsError;
use walletpool::secrets::SecretString;
use walletpool::tls::{TlsContext, TlsContextBuilder};
use walletpool::Error;

fn build_context(
    wallet: &TestWallet,
    min_version: TlsMinVersion,
    password: &str,
) -> walletpool::Result<Option<TlsContext>> {
    let password = SecretString::from(password);
    TlsContextBuilder::new(min_version).build(
        Some(wallet.key_store_pem.as_bytes()),
        Some(wallet.ca_cert_pem.as_bytes()),
        Some(&password),
    )
}

struct Handshake {
    peer_certificate: Option<Vec<u8>>,
    version: Option<ProtocolVersion>,
}

/// Run one request/response over mutual TLS and report what the server saw.
async fn handshake(
    context: &TlsContext,
    server: Arc<ServerConfig>,
) -> anyhow::Result<Handshake> {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let acceptor = TlsAcceptor::from(server);
    let connector = TlsConnector::from(context.client_config());

    let server_side = async move {
        let mut stream = acceptor.accept(server_io).await?;
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).await?;
        stream.write_all(b"pong").await?;
        stream.flush().await?;

        let (_, connection) = stream.get_ref();
        let peer_certificate =
            connection.peer_certificates().and_then(|certs| certs.first()).map(|c| c.to_vec());
        Ok::<_, std::io::Error>(Handshake {
            peer_certificate,
            version: connection.protocol_version(),
        })
    };

    let client_side = async move {
        let server_name = ServerName::try_from(SERVER_NAME.to_string())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        let mut stream = connector.connect(server_name, client_io).await?;
        stream.write_all(b"ping").await?;
        stream.flush().await?;
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).await?;
        Ok::<_, std::io::Error>(buf)
    };

    let (server_result, client_result) = tokio::join!(server_side, client_side);
    let reply = client_result?;
    assert_eq!(&reply, b"pong");
    Ok(server_result?)
}

#[tokio::test]
async fn test_mutual_tls_handshake_presents_client_certificate() -> anyhow::Result<()> {
    let wallet = TestWallet::generate(KEY_STORE_PASSWORD)?;
    let context = build_context(&wallet, TlsMinVersion::Tls12, KEY_STORE_PASSWORD)?
        .expect("key store present");

    assert_eq!(context.chain_len(), 1);
    assert_eq!(context.trust_anchor_count(), 1);

    let server = wallet.server_config(rustls::DEFAULT_VERSIONS)?;
    let outcome = handshake(&context, server).await?;

    assert_eq!(outcome.peer_certificate.as_deref(), Some(wallet.client_cert_der.as_ref()));
    Ok(())
}

#[tokio::test]
async fn test_tls12_minimum_still_negotiates_tls12_servers() -> anyhow::Result<()> {
    let wallet = TestWallet::generate(KEY_STORE_PASSWORD)?;
    let context = build_context(&wallet, TlsMinVersion::Tls12, KEY_STORE_PASSWORD)?
        .expect("key store present");

    let server = wallet.server_config(&[&rustls::version::TLS12])?;
    let outcome = handshake(&context, server).await?;

    assert_eq!(outcome.version, Some(ProtocolVersion::TLSv1_2));
    Ok(())
}

#[tokio::test]
async fn test_tls13_minimum_rejects_tls12_only_server() -> anyhow::Result<()> {
    let wallet = TestWallet::generate(KEY_STORE_PASSWORD)?;
    let context = build_context(&wallet, TlsMinVersion::Tls13, KEY_STORE_PASSWORD)?
        .expect("key store present");
    assert_eq!(context.min_version(), TlsMinVersion::Tls13);

    let tls13_server = wallet.server_config(rustls::DEFAULT_VERSIONS)?;
    let outcome = handshake(&context, tls13_server).await?;
    assert_eq!(outcome.version, Some(ProtocolVersion::TLSv1_3));

    let tls12_server = wallet.server_config(&[&rustls::version::TLS12])?;
    assert!(handshake(&context, tls12_server).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_server_from_unknown_ca_is_rejected() -> anyhow::Result<()> {
    let wallet = TestWallet::generate(KEY_STORE_PASSWORD)?;
    let stranger = TestWallet::generate(KEY_STORE_PASSWORD)?;
    let context = build_context(&wallet, TlsMinVersion::Tls12, KEY_STORE_PASSWORD)?
        .expect("key store present");

    let server = stranger.server_config(rustls::DEFAULT_VERSIONS)?;
    assert!(handshake(&context, server).await.is_err());
    Ok(())
}

#[test]
fn test_wrong_password_fails_decryption() -> anyhow::Result<()> {
    let wallet = TestWallet::generate(KEY_STORE_PASSWORD)?;

    let err = build_context(&wallet, TlsMinVersion::Tls12, "not-the-password").unwrap_err();
    assert!(matches!(err, Error::TlsBootstrapFailed(TlsError::KeyDecryption { .. })));
    assert!(!err.to_string().contains("not-the-password"));
    Ok(())
}

#[test]
fn test_plaintext_key_store_is_rejected() -> anyhow::Result<()> {
    let wallet = TestWallet::generate(KEY_STORE_PASSWORD)?;
    let plaintext = wallet.plaintext_key_store_pem();
    let password = SecretString::from(KEY_STORE_PASSWORD);

    let err = TlsContextBuilder::new(TlsMinVersion::Tls12)
        .build(Some(plaintext.as_bytes()), Some(wallet.ca_cert_pem.as_bytes()), Some(&password))
        .unwrap_err();
    assert!(matches!(err, Error::TlsBootstrapFailed(TlsError::PlaintextKeyRejected)));
    Ok(())
}

#[test]
fn test_garbage_key_store_fails() {
    let password = SecretString::from(KEY_STORE_PASSWORD);

    let err = TlsContextBuilder::new(TlsMinVersion::Tls12)
        .build(Some(b"definitely not a wallet".as_slice()), Some(b"".as_slice()), Some(&password))
        .unwrap_err();
    assert!(matches!(err, Error::TlsBootstrapFailed(_)));
}

#[test]
fn test_trust_store_is_required() -> anyhow::Result<()> {
    let wallet = TestWallet::generate(KEY_STORE_PASSWORD)?;
    let password = SecretString::from(KEY_STORE_PASSWORD);

    let err = TlsContextBuilder::new(TlsMinVersion::Tls12)
        .build(Some(wallet.key_store_pem.as_bytes()), None, Some(&password))
        .unwrap_err();
    assert!(matches!(err, Error::TlsBootstrapFailed(TlsError::MissingTrustStore)));
    Ok(())
}
