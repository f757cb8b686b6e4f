//! Process-wide rustls crypto provider.
//!
//! The default build installs ring. Building with the `fips` feature installs the
//! FIPS-validated aws-lc-rs provider instead.

use rustls::crypto::CryptoProvider;
use std::sync::Arc;
use tracing::debug;

use crate::errors::TlsError;

/// Install the process default crypto provider if none is installed yet and
/// return the one in effect.
///
/// Safe to call any number of times from any thread.
pub fn install_default_provider() -> Result<Arc<CryptoProvider>, TlsError> {
    if let Some(provider) = CryptoProvider::get_default() {
        return Ok(provider.clone());
    }

    // Another thread may install first; whichever provider won is used.
    if selected_provider().install_default().is_ok() {
        debug!(fips = cfg!(feature = "fips"), "Installed rustls crypto provider");
    }

    CryptoProvider::get_default().cloned().ok_or(TlsError::ProviderUnavailable)
}

#[cfg(not(feature = "fips"))]
fn selected_provider() -> CryptoProvider {
    rustls::crypto::ring::default_provider()
}

#[cfg(feature = "fips")]
fn selected_provider() -> CryptoProvider {
    rustls::crypto::default_fips_provider()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_is_idempotent() {
        let first = install_default_provider().unwrap();
        let second = install_default_provider().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!first.cipher_suites.is_empty());
    }

    #[test]
    fn test_concurrent_installs_agree() {
        let handles: Vec<_> =
            (0..8).map(|_| std::thread::spawn(install_default_provider)).collect();

        let providers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect();
        assert!(providers.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }
}
