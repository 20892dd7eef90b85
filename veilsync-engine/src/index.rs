//! Per-directory decrypted listing index.
//!
//! A `DirectoryIndex` is built fresh for each remote directory visit from
//! one atomic `listdir` call and discarded with it — it is never persisted
//! or shared across invocations. Both views are derived from that single
//! snapshot, so they can never disagree within one visit.

use crate::error::SyncResult;
use crate::metadata::MetadataCodec;
use std::collections::{BTreeMap, HashMap};
use tracing::{trace, warn};
use veilsync_connector::{NodeKind, ObjectStoreConnector};

/// Decrypted identity of one remote node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedNode {
    pub original_name: String,
    pub size: u64,
    pub kind: NodeKind,
}

/// Bidirectional index between original names and remote identifiers for
/// one remote directory.
///
/// `by_original_name` is set-valued: repeated uploads or third-party
/// writers can legally produce several remote identifiers for the same
/// original name. Identifiers are kept in listing order, and every
/// "pick one" operation resolves to the **first listed** — a deliberate,
/// documented tie-break.
pub struct DirectoryIndex {
    by_remote_id: HashMap<String, IndexedNode>,
    by_original_name: BTreeMap<String, Vec<String>>,
}

impl DirectoryIndex {
    /// Builds the index from one listing of `remote_dir`.
    ///
    /// Entries whose metadata bag does not decode are skipped without
    /// aborting the listing: silently when `remote_dir` is the managed
    /// application root (the root itself legitimately carries no bag),
    /// logged otherwise (foreign or damaged node).
    pub async fn build(
        connector: &dyn ObjectStoreConnector,
        codec: &MetadataCodec,
        remote_dir: &str,
        app_base_path: &str,
    ) -> SyncResult<Self> {
        let mut index = Self {
            by_remote_id: HashMap::new(),
            by_original_name: BTreeMap::new(),
        };

        for entry in connector.listdir(remote_dir).await? {
            match codec.decode(&entry.metadata) {
                Ok((original_name, size)) => {
                    index
                        .by_original_name
                        .entry(original_name.clone())
                        .or_default()
                        .push(entry.name.clone());
                    index.by_remote_id.insert(
                        entry.name,
                        IndexedNode {
                            original_name,
                            size,
                            kind: entry.kind,
                        },
                    );
                }
                Err(e) if remote_dir == app_base_path => {
                    trace!(id = %entry.name, "undecodable entry under managed root, skipping: {e}");
                }
                Err(e) => {
                    warn!(dir = %remote_dir, id = %entry.name, "skipping undecodable listing entry: {e}");
                }
            }
        }

        Ok(index)
    }

    /// True if some remote identifier carries `original_name`.
    pub fn contains_name(&self, original_name: &str) -> bool {
        self.by_original_name.contains_key(original_name)
    }

    /// First-listed remote identifier carrying `original_name`.
    pub fn first_id_for(&self, original_name: &str) -> Option<&str> {
        self.by_original_name
            .get(original_name)
            .and_then(|ids| ids.first())
            .map(String::as_str)
    }

    /// All remote identifiers carrying `original_name`, in listing order.
    pub fn ids_for(&self, original_name: &str) -> Option<&[String]> {
        self.by_original_name
            .get(original_name)
            .map(Vec::as_slice)
    }

    /// Decrypted identity for a remote identifier.
    pub fn node(&self, remote_id: &str) -> Option<&IndexedNode> {
        self.by_remote_id.get(remote_id)
    }

    /// Original names present in this directory.
    pub fn original_names(&self) -> impl Iterator<Item = &str> {
        self.by_original_name.keys().map(String::as_str)
    }

    /// Number of decodable nodes in the snapshot.
    pub fn len(&self) -> usize {
        self.by_remote_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_remote_id.is_empty()
    }
}
