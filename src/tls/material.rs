//! Base64 decoding of key store and trust store blobs.

use base64::Engine;
use std::fmt;
use zeroize::Zeroizing;

use crate::errors::{Error, Result};
use crate::secrets::{ResolvedDatabaseConfig, SecretBytes, SecretString};

/// Decodes base64 configuration values into raw store bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustMaterialDecoder;

impl TrustMaterialDecoder {
    /// Decode one field.
    ///
    /// An absent or empty value (after trimming surrounding whitespace) yields
    /// `None`. Anything else must be standard base64 with padding.
    pub fn decode(field: &str, value: Option<&SecretString>) -> Result<Option<SecretBytes>> {
        let Some(value) = value else {
            return Ok(None);
        };

        let encoded = value.expose_secret().trim();
        if encoded.is_empty() {
            return Ok(None);
        }

        let bytes = base64::engine::general_purpose::STANDARD.decode(encoded).map_err(|e| {
            Error::MalformedKeyMaterial {
                field: field.to_string(),
                reason: "value is not valid base64".to_string(),
                source: Some(Box::new(e)),
            }
        })?;

        Ok(Some(Zeroizing::new(bytes)))
    }
}

/// Decoded key store and trust store bytes, held only in memory.
#[derive(Default)]
pub struct TrustMaterial {
    key_store: Option<SecretBytes>,
    trust_store: Option<SecretBytes>,
}

impl TrustMaterial {
    /// Decode the stores from a resolved configuration.
    ///
    /// The trust store is only decoded when a key store is present; without a
    /// client identity no TLS context is built and the trust store is unused.
    pub fn from_resolved(config: &ResolvedDatabaseConfig) -> Result<Self> {
        let key_store =
            TrustMaterialDecoder::decode("key_store_base64", config.key_store_base64())?;
        if key_store.is_none() {
            return Ok(Self::default());
        }

        let trust_store =
            TrustMaterialDecoder::decode("trust_store_base64", config.trust_store_base64())?;
        Ok(Self { key_store, trust_store })
    }

    pub fn key_store(&self) -> Option<&[u8]> {
        self.key_store.as_ref().map(|bytes| bytes.as_slice())
    }

    pub fn trust_store(&self) -> Option<&[u8]> {
        self.trust_store.as_ref().map(|bytes| bytes.as_slice())
    }
}

impl fmt::Debug for TrustMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustMaterial")
            .field("key_store_len", &self.key_store.as_ref().map(|b| b.len()))
            .field("trust_store_len", &self.trust_store.as_ref().map(|b| b.len()))
            .finish()
    }
}
