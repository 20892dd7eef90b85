//! Engine error types.

use crate::metadata::MetadataDecodeError;
use thiserror::Error;
use veilsync_connector::ConnectorError;
use veilsync_crypto::CryptoError;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by the sync engine.
///
/// Construction-time errors ([`Config`](Self::Config),
/// [`Credential`](Self::Credential)) are fatal and immediate. Per-entry
/// metadata decode failures during a directory listing are absorbed by
/// [`DirectoryIndex::build`](crate::DirectoryIndex::build); everything
/// else unwinds the current operation. The engine never retries.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("credential token failed authenticated decryption (wrong passphrase?)")]
    Credential,

    #[error("invalid transfer target: {0}")]
    InvalidTarget(String),

    #[error("metadata decode failed: {0}")]
    Metadata(#[from] MetadataDecodeError),

    #[error("content decryption failed (wrong key or tampered data)")]
    Authentication,

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error("local I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CryptoError> for SyncError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::Authentication => SyncError::Authentication,
            other => SyncError::Crypto(other.to_string()),
        }
    }
}
