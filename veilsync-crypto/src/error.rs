//! Cipher suite error types.

use thiserror::Error;

/// Result type for cipher operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur while encrypting or decrypting a block.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("authentication failed (wrong key or tampered data)")]
    Authentication,

    #[error("encrypted block too short: {len} bytes (need nonce + tag)")]
    Truncated { len: usize },

    #[error("encryption failed: {0}")]
    Encryption(String),
}
