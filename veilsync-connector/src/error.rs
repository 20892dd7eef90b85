//! Connector error types.

use thiserror::Error;

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Transport-level errors surfaced by a connector.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("remote path not found: {0}")]
    NotFound(String),

    #[error("remote path is not a directory: {0}")]
    NotADirectory(String),

    #[error("remote path already exists: {0}")]
    AlreadyExists(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("local I/O error: {0}")]
    Io(#[from] std::io::Error),
}
