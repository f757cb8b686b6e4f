//! # TLS Bootstrap
//!
//! Turns decoded wallet material into a mutual-TLS client context:
//!
//! - [`TrustMaterialDecoder`] decodes the base64 key store and trust store fields
//! - [`TlsContextBuilder`] loads the certificate chain, decrypts the client key,
//!   builds the trust anchors and produces a [`TlsContext`]
//!
//! Material stays in memory for the whole sequence.

pub mod context;
pub mod crypto;
pub mod keystore;
pub mod material;

pub use context::{TlsContext, TlsContextBuilder};
pub use crypto::install_default_provider;
pub use keystore::{load_key_store, load_trust_store, KeyStore};
pub use material::{TrustMaterial, TrustMaterialDecoder};
