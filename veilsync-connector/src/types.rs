//! Shared remote-node types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether a remote node is a file or a directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Dir,
}

impl NodeKind {
    pub fn is_dir(self) -> bool {
        matches!(self, NodeKind::Dir)
    }
}

/// Opaque key/value side-channel attached to a remote node.
///
/// The store treats fields as plain strings; the engine stores hex-encoded
/// ciphertext in them. An empty bag means "read-only probe" when passed to
/// [`ObjectStoreConnector::patch`](crate::ObjectStoreConnector::patch).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataBag(BTreeMap<String, String>);

impl MetadataBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Overlays `other`'s fields onto this bag.
    pub fn merge(&mut self, other: &MetadataBag) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for MetadataBag {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One node in a remote directory listing.
#[derive(Clone, Debug)]
pub struct RemoteEntry {
    /// Base name under which the node is actually stored (the remote
    /// identifier for engine-managed nodes).
    pub name: String,
    pub kind: NodeKind,
    /// Attached metadata bag (may be empty for foreign/unmanaged nodes).
    pub metadata: MetadataBag,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bag_probes() {
        assert!(MetadataBag::new().is_empty());
    }

    #[test]
    fn merge_overlays_fields() {
        let mut bag: MetadataBag = [("a".to_string(), "1".to_string())]
            .into_iter()
            .collect();
        let update: MetadataBag = [
            ("a".to_string(), "2".to_string()),
            ("b".to_string(), "3".to_string()),
        ]
        .into_iter()
        .collect();

        bag.merge(&update);
        assert_eq!(bag.get("a"), Some("2"));
        assert_eq!(bag.get("b"), Some("3"));
        assert_eq!(bag.len(), 2);
    }
}
