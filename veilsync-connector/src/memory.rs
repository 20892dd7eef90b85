//! In-memory object store for tests and demos.
//!
//! Keeps a flat map of normalized remote path -> node and enforces the
//! same contract a real store does: parents must exist, `mkdir` on an
//! existing path fails, `listdir` returns immediate children only, and
//! `remove` drops the whole subtree atomically (node and bag together).

use crate::error::{ConnectorError, ConnectorResult};
use crate::types::{MetadataBag, NodeKind, RemoteEntry};
use crate::ObjectStoreConnector;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Clone, Debug)]
struct MemNode {
    kind: NodeKind,
    data: Vec<u8>,
    bag: MetadataBag,
}

/// In-process [`ObjectStoreConnector`] backed by a `BTreeMap`.
///
/// Listing order is lexicographic over remote identifiers, which makes
/// "first listed" deterministic in tests.
pub struct MemoryConnector {
    nodes: Mutex<BTreeMap<String, MemNode>>,
}

/// Normalizes a remote path: forward slashes, leading `/`, no trailing `/`.
fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn parent_of(path: &str) -> Option<String> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(idx) => Some(path[..idx].to_string()),
        None => None,
    }
}

fn base_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

impl MemoryConnector {
    /// Creates an empty store containing only the root directory `/`.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "/".to_string(),
            MemNode {
                kind: NodeKind::Dir,
                data: Vec::new(),
                bag: MetadataBag::new(),
            },
        );
        Self {
            nodes: Mutex::new(nodes),
        }
    }

    /// Creates the directory chain for `path` (test setup convenience).
    pub async fn mkdir_all(&self, path: &str) -> ConnectorResult<()> {
        let path = normalize(path);
        let mut prefix = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            prefix.push('/');
            prefix.push_str(segment);
            match self.mkdir(&prefix).await {
                Ok(()) | Err(ConnectorError::AlreadyExists(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Total number of nodes, excluding the root.
    pub async fn node_count(&self) -> usize {
        self.nodes.lock().await.len() - 1
    }

    /// All stored paths strictly below `prefix`, in listing order.
    pub async fn paths_under(&self, prefix: &str) -> Vec<String> {
        let prefix = normalize(prefix);
        let want = if prefix == "/" {
            "/".to_string()
        } else {
            format!("{prefix}/")
        };
        self.nodes
            .lock()
            .await
            .keys()
            .filter(|p| p.as_str() != "/" && p.starts_with(&want))
            .cloned()
            .collect()
    }

    /// Raw stored bytes of a file node.
    pub async fn raw_bytes(&self, path: &str) -> Option<Vec<u8>> {
        let path = normalize(path);
        self.nodes.lock().await.get(&path).map(|n| n.data.clone())
    }

    /// Stored metadata bag of a node.
    pub async fn bag_of(&self, path: &str) -> Option<MetadataBag> {
        let path = normalize(path);
        self.nodes.lock().await.get(&path).map(|n| n.bag.clone())
    }

    /// Replaces a node's stored bytes, bypassing the connector contract
    /// (tamper simulation in tests).
    pub async fn corrupt_bytes(&self, path: &str, data: Vec<u8>) {
        let path = normalize(path);
        if let Some(node) = self.nodes.lock().await.get_mut(&path) {
            node.data = data;
        }
    }

    /// Overwrites a single bag field, bypassing the connector contract.
    pub async fn corrupt_bag_field(&self, path: &str, field: &str, value: &str) {
        let path = normalize(path);
        if let Some(node) = self.nodes.lock().await.get_mut(&path) {
            node.bag.insert(field, value);
        }
    }
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStoreConnector for MemoryConnector {
    async fn upload(&self, data: Vec<u8>, remote_path: &str) -> ConnectorResult<()> {
        let path = normalize(remote_path);
        let parent = parent_of(&path).ok_or_else(|| ConnectorError::NotFound(path.clone()))?;

        let mut nodes = self.nodes.lock().await;
        match nodes.get(&parent) {
            None => return Err(ConnectorError::NotFound(parent)),
            Some(node) if !node.kind.is_dir() => {
                return Err(ConnectorError::NotADirectory(parent))
            }
            Some(_) => {}
        }

        debug!(path = %path, bytes = data.len(), "memory upload");
        nodes.insert(
            path,
            MemNode {
                kind: NodeKind::File,
                data,
                bag: MetadataBag::new(),
            },
        );
        Ok(())
    }

    async fn download(&self, remote_path: &str, local_path: &Path) -> ConnectorResult<()> {
        let path = normalize(remote_path);
        let data = {
            let nodes = self.nodes.lock().await;
            let node = nodes
                .get(&path)
                .ok_or_else(|| ConnectorError::NotFound(path.clone()))?;
            if node.kind.is_dir() {
                return Err(ConnectorError::Transport(format!(
                    "cannot download a directory: {path}"
                )));
            }
            node.data.clone()
        };
        tokio::fs::write(local_path, data).await?;
        Ok(())
    }

    async fn mkdir(&self, remote_path: &str) -> ConnectorResult<()> {
        let path = normalize(remote_path);
        let parent = parent_of(&path).ok_or_else(|| ConnectorError::AlreadyExists(path.clone()))?;

        let mut nodes = self.nodes.lock().await;
        if nodes.contains_key(&path) {
            return Err(ConnectorError::AlreadyExists(path));
        }
        match nodes.get(&parent) {
            None => return Err(ConnectorError::NotFound(parent)),
            Some(node) if !node.kind.is_dir() => {
                return Err(ConnectorError::NotADirectory(parent))
            }
            Some(_) => {}
        }

        debug!(path = %path, "memory mkdir");
        nodes.insert(
            path,
            MemNode {
                kind: NodeKind::Dir,
                data: Vec::new(),
                bag: MetadataBag::new(),
            },
        );
        Ok(())
    }

    async fn listdir(&self, remote_path: &str) -> ConnectorResult<Vec<RemoteEntry>> {
        let path = normalize(remote_path);
        let nodes = self.nodes.lock().await;
        match nodes.get(&path) {
            None => return Err(ConnectorError::NotFound(path)),
            Some(node) if !node.kind.is_dir() => return Err(ConnectorError::NotADirectory(path)),
            Some(_) => {}
        }

        let child_prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{path}/")
        };

        let entries = nodes
            .iter()
            .filter(|(p, _)| {
                p.starts_with(&child_prefix)
                    && p.as_str() != "/"
                    && !p[child_prefix.len()..].contains('/')
            })
            .map(|(p, node)| RemoteEntry {
                name: base_name(p),
                kind: node.kind,
                metadata: node.bag.clone(),
            })
            .collect();
        Ok(entries)
    }

    async fn patch(&self, remote_path: &str, bag: MetadataBag) -> ConnectorResult<RemoteEntry> {
        let path = normalize(remote_path);
        let mut nodes = self.nodes.lock().await;
        let node = nodes
            .get_mut(&path)
            .ok_or_else(|| ConnectorError::NotFound(path.clone()))?;

        if !bag.is_empty() {
            node.bag.merge(&bag);
        }
        Ok(RemoteEntry {
            name: base_name(&path),
            kind: node.kind,
            metadata: node.bag.clone(),
        })
    }

    async fn remove(&self, remote_path: &str, permanently: bool) -> ConnectorResult<()> {
        let path = normalize(remote_path);
        if !permanently {
            debug!(path = %path, "memory store has no trash; deleting permanently");
        }

        let mut nodes = self.nodes.lock().await;
        if !nodes.contains_key(&path) {
            return Err(ConnectorError::NotFound(path));
        }

        let subtree_prefix = format!("{path}/");
        nodes.retain(|p, _| p != &path && !p.starts_with(&subtree_prefix));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn upload_requires_existing_parent_directory() {
        let store = MemoryConnector::new();
        let err = store.upload(b"x".to_vec(), "/missing/file").await.unwrap_err();
        assert!(matches!(err, ConnectorError::NotFound(_)));
    }

    #[tokio::test]
    async fn mkdir_twice_reports_already_exists() {
        let store = MemoryConnector::new();
        store.mkdir("/a").await.unwrap();
        assert!(matches!(
            store.mkdir("/a").await,
            Err(ConnectorError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn listdir_returns_immediate_children_only() {
        let store = MemoryConnector::new();
        store.mkdir_all("/a/b").await.unwrap();
        store.upload(b"1".to_vec(), "/a/f1").await.unwrap();
        store.upload(b"2".to_vec(), "/a/b/f2").await.unwrap();

        let names: Vec<String> = store
            .listdir("/a")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["b".to_string(), "f1".to_string()]);
    }

    #[tokio::test]
    async fn patch_with_empty_bag_is_a_pure_probe() {
        let store = MemoryConnector::new();
        store.mkdir("/a").await.unwrap();

        let entry = store.patch("/a", MetadataBag::new()).await.unwrap();
        assert_eq!(entry.kind, NodeKind::Dir);
        assert!(entry.metadata.is_empty());
    }

    #[tokio::test]
    async fn patch_merges_and_returns_updated_bag() {
        let store = MemoryConnector::new();
        store.upload(b"data".to_vec(), "/f").await.unwrap();

        let mut bag = MetadataBag::new();
        bag.insert("my1", "aabb");
        let entry = store.patch("/f", bag).await.unwrap();
        assert_eq!(entry.metadata.get("my1"), Some("aabb"));

        // Probe sees the stored value.
        let probed = store.patch("/f", MetadataBag::new()).await.unwrap();
        assert_eq!(probed.metadata.get("my1"), Some("aabb"));
    }

    #[tokio::test]
    async fn remove_drops_whole_subtree() {
        let store = MemoryConnector::new();
        store.mkdir_all("/a/b").await.unwrap();
        store.upload(b"1".to_vec(), "/a/b/f").await.unwrap();

        store.remove("/a", true).await.unwrap();
        assert_eq!(store.node_count().await, 0);
        assert!(matches!(
            store.listdir("/a").await,
            Err(ConnectorError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn download_writes_stored_bytes() {
        let store = MemoryConnector::new();
        store.upload(b"payload".to_vec(), "/f").await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.bin");
        store.download("/f", &target).await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn backslash_paths_are_normalized() {
        let store = MemoryConnector::new();
        store.mkdir("\\a").await.unwrap();
        assert!(store.listdir("/a").await.unwrap().is_empty());
    }
}
