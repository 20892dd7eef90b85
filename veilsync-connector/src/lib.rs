//! Object store connectors for veilsync.
//!
//! A connector is the transport seam between the sync engine and a remote
//! object store: upload/download bytes, create and list directories, attach
//! or read the metadata bag on a node, delete a node. The engine never
//! retries transport failures; retry/backoff belongs to the connector or a
//! calling layer.
//!
//! Two implementations ship here:
//! - [`MemoryConnector`] — in-process tree for tests and demos
//! - [`S3Connector`] — thin adapter over `aws-sdk-s3`

pub mod error;
pub mod memory;
pub mod s3;
pub mod types;

use async_trait::async_trait;
use std::path::Path;

pub use error::{ConnectorError, ConnectorResult};
pub use memory::MemoryConnector;
pub use s3::S3Connector;
pub use types::{MetadataBag, NodeKind, RemoteEntry};

/// Remote CRUD consumed by the sync engine.
///
/// Every call is one logical round trip. Implementations must treat the
/// metadata bag as an opaque key/value side-channel attached to a node:
/// an empty bag passed to [`patch`](Self::patch) is a read-only probe,
/// a non-empty bag is merged into the node's stored bag.
#[async_trait]
pub trait ObjectStoreConnector: Send + Sync {
    /// Uploads `data` as the file at `remote_path`.
    async fn upload(&self, data: Vec<u8>, remote_path: &str) -> ConnectorResult<()>;

    /// Downloads the file at `remote_path` into `local_path`.
    async fn download(&self, remote_path: &str, local_path: &Path) -> ConnectorResult<()>;

    /// Creates the directory at `remote_path` (parent must exist).
    async fn mkdir(&self, remote_path: &str) -> ConnectorResult<()>;

    /// Lists the immediate children of the directory at `remote_path`.
    async fn listdir(&self, remote_path: &str) -> ConnectorResult<Vec<RemoteEntry>>;

    /// Reads or updates the metadata bag attached to `remote_path`.
    ///
    /// Returns the node's current entry; with a non-empty `bag` the stored
    /// bag is updated first. Also the existence/type probe for a path.
    async fn patch(&self, remote_path: &str, bag: MetadataBag) -> ConnectorResult<RemoteEntry>;

    /// Deletes the node at `remote_path` (recursively for directories).
    async fn remove(&self, remote_path: &str, permanently: bool) -> ConnectorResult<()>;
}
