//! # Error Handling
//!
//! Error types for the walletpool bootstrap sequence, built with `thiserror`.

pub mod tls;
pub mod types;

pub use tls::TlsError;
pub use types::{Error, Result};
