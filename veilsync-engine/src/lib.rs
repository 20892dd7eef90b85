//! Sync and name-obfuscation engine for veilsync.
//!
//! Mirrors a local directory tree onto a remote object store while keeping
//! file contents encrypted at rest and hiding original file and directory
//! names from the storage provider:
//!
//! - every remote node is stored under a random UUIDv4 identifier
//! - the original base name and size travel as encrypted fields in the
//!   node's metadata bag ([`MetadataCodec`])
//! - per remote directory, a [`DirectoryIndex`] maps identifiers back to
//!   original names (and names to the set of identifiers carrying them)
//! - [`SyncEngine::send`] mirrors local -> remote without re-uploading
//!   nodes whose original name already exists in the target directory;
//!   [`SyncEngine::receive`] reconstructs the original tree locally
//!
//! Tree topology and ciphertext lengths are not hidden — only leaf names
//! and contents. Transport goes through an [`ObjectStoreConnector`]
//! implementation; confidentiality through a [`CipherSuite`].
//!
//! [`ObjectStoreConnector`]: veilsync_connector::ObjectStoreConnector
//! [`CipherSuite`]: veilsync_crypto::CipherSuite

pub mod config;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod index;
pub mod metadata;
pub mod paths;
mod staging;

pub use config::{SyncConfig, MANAGED_PREFIX};
pub use engine::{LocalNode, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use index::{DirectoryIndex, IndexedNode};
pub use metadata::{MetadataCodec, MetadataDecodeError};
