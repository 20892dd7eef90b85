//! Sealed access-token handling.
//!
//! The store access token is kept at rest as one CipherSuite-encrypted
//! block and unsealed at startup with the passphrase-derived key, so the
//! cleartext token never lives in configuration files.

use crate::error::{SyncError, SyncResult};
use veilsync_crypto::{CipherSuite, CryptoResult};

/// Encrypts an access token for storage (provisioning helper).
pub fn seal_token(cipher: &dyn CipherSuite, token: &str) -> CryptoResult<Vec<u8>> {
    cipher.encrypt(token.as_bytes())
}

/// Decrypts a sealed access token.
///
/// Any failure — bad block, wrong passphrase, non-UTF-8 plaintext — maps
/// to [`SyncError::Credential`]; the caller learns nothing beyond "the
/// passphrase does not open this token".
pub fn unseal_token(cipher: &dyn CipherSuite, sealed: &[u8]) -> SyncResult<String> {
    let plaintext = cipher.decrypt(sealed).map_err(|_| SyncError::Credential)?;
    String::from_utf8(plaintext).map_err(|_| SyncError::Credential)
}
