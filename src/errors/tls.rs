use thiserror::Error;

/// TLS-specific error variants surfaced while loading wallet material into a TLS context.
#[derive(Debug, Error)]
pub enum TlsError {
    /// The key store was supplied without the password that unlocks it.
    #[error("Key store is present but no key store password is configured")]
    MissingKeyStorePassword,

    /// A key store was supplied without a trust store to verify the server against.
    #[error("Key store is present but no trust store is configured")]
    MissingTrustStore,

    /// The key store does not contain any certificates.
    #[error("Key store does not contain a certificate chain")]
    EmptyCertificateChain,

    /// The trust store does not contain any CA certificates.
    #[error("Trust store does not contain any CA certificates")]
    EmptyTrustStore,

    /// A certificate block in one of the stores could not be parsed.
    #[error("{store} contains an invalid certificate: {reason}")]
    InvalidCertificate { store: &'static str, reason: String },

    /// The key store does not hold an encrypted private key.
    #[error("Key store must contain exactly one ENCRYPTED PRIVATE KEY block")]
    MissingEncryptedKey,

    /// The key store holds an unencrypted private key.
    #[error("Key store contains an unencrypted private key; only encrypted PKCS#8 is accepted")]
    PlaintextKeyRejected,

    /// The encrypted private key could not be decoded or decrypted.
    #[error("Failed to decrypt key store private key: {reason}")]
    KeyDecryption { reason: String },

    /// A CA certificate was rejected by the trust anchor store.
    #[error("Trust store certificate rejected: {source}")]
    TrustAnchor {
        #[source]
        source: rustls::Error,
    },

    /// The configured minimum protocol version is not supported by the crypto provider.
    #[error("Invalid TLS protocol configuration: {source}")]
    ProtocolVersions {
        #[source]
        source: rustls::Error,
    },

    /// The client certificate and key could not be bound into the TLS context.
    #[error("Failed to install client certificate: {source}")]
    ClientCertificate {
        #[source]
        source: rustls::Error,
    },

    /// The process crypto provider could not be installed or found.
    #[error("No process crypto provider is available")]
    ProviderUnavailable,

    /// Re-encoding material for the database driver failed.
    #[error("Failed to encode {what} for the database driver: {reason}")]
    Encoding { what: &'static str, reason: String },
}
