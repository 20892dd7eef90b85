//! Sync orchestrator.
//!
//! `SyncEngine` walks the local tree (send) or the remote tree (receive),
//! consulting a fresh [`DirectoryIndex`] per directory before deciding to
//! create, reuse, or transfer, and the [`MetadataCodec`] whenever a new
//! remote node must carry its original identity. Transport is delegated
//! to the connector, confidentiality to the cipher suite.
//!
//! Everything is one logical thread of control: remote calls are awaited
//! strictly one at a time, and the per-call state (`DirectoryIndex`,
//! `PathTranslationMap`) is created and discarded within a single
//! top-level operation. Two concurrent sends into the *same* remote
//! directory can race on the listing-then-create decision; the set-valued
//! name index absorbs the resulting duplicates.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::index::DirectoryIndex;
use crate::metadata::MetadataCodec;
use crate::paths;
use crate::staging::StagedFile;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use veilsync_connector::{MetadataBag, ObjectStoreConnector};
use veilsync_crypto::CipherSuite;

/// A local file or directory, addressed by its real path.
///
/// Send dispatches over this explicitly instead of type-testing inside
/// the walk, so each case stays testable in isolation.
#[derive(Clone, Debug)]
pub enum LocalNode {
    File(PathBuf),
    Dir(PathBuf),
}

impl LocalNode {
    /// Classifies an existing local path.
    pub fn classify(path: &Path) -> SyncResult<Self> {
        let meta = std::fs::metadata(path)?;
        if meta.is_dir() {
            Ok(LocalNode::Dir(path.to_path_buf()))
        } else {
            Ok(LocalNode::File(path.to_path_buf()))
        }
    }
}

/// Local absolute path -> decided remote path, scoped to one `send` call.
///
/// Pre-order traversal guarantees a directory's remote location is
/// recorded here before any of its children are processed.
struct PathTranslationMap {
    map: HashMap<PathBuf, String>,
}

impl PathTranslationMap {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    fn record(&mut self, local: PathBuf, remote: String) {
        self.map.insert(local, remote);
    }

    fn resolve(&self, local: &Path) -> Option<&str> {
        self.map.get(local).map(String::as_str)
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

/// Mirrors local trees onto a remote object store with encrypted content
/// and obscured names, and reconstructs them back.
pub struct SyncEngine {
    connector: Arc<dyn ObjectStoreConnector>,
    cipher: Arc<dyn CipherSuite>,
    codec: MetadataCodec,
    app_base_path: String,
}

impl SyncEngine {
    /// Validates the config and assembles the engine.
    ///
    /// Fails with [`SyncError::Config`] when the application root lies
    /// outside the managed namespace prefix.
    pub fn new(
        config: SyncConfig,
        connector: Arc<dyn ObjectStoreConnector>,
        cipher: Arc<dyn CipherSuite>,
    ) -> SyncResult<Self> {
        let app_base_path = config.validate()?;
        let codec = MetadataCodec::new(cipher.clone(), config.name_field, config.size_field);
        Ok(Self {
            connector,
            cipher,
            codec,
            app_base_path,
        })
    }

    /// Normalized application root on the remote store.
    pub fn app_base_path(&self) -> &str {
        &self.app_base_path
    }

    /// The engine's metadata codec (useful for inspecting stored bags).
    pub fn codec(&self) -> &MetadataCodec {
        &self.codec
    }

    /// Recursively mirrors `local_path` into the remote directory
    /// `remote_dir` (resolved under the application root).
    ///
    /// Idempotent by original name: a file or directory whose name is
    /// already present in the target remote directory is reused or
    /// skipped, so re-sending an unchanged tree performs zero transfers.
    /// Content changes under an existing name are **not** detected — the
    /// stale remote copy is left in place. Remote identifiers are random
    /// UUIDs with no collision detection; within-directory collisions are
    /// treated as negligible.
    pub async fn send(&self, local_path: &Path, remote_dir: &str) -> SyncResult<()> {
        let remote_dir = self.resolve_remote(remote_dir);
        self.probe_remote_dir(&remote_dir).await?;

        info!(local = %local_path.display(), remote = %remote_dir, "send starting");

        match LocalNode::classify(local_path)? {
            LocalNode::Dir(dir) => self.send_tree(&dir, &remote_dir).await,
            LocalNode::File(file) => {
                let name = base_name(&file)?;
                let index = self.build_index(&remote_dir).await?;
                if index.contains_name(&name) {
                    debug!(file = %name, "already on remote, skipping");
                    Ok(())
                } else {
                    self.send_file(&file, &remote_dir).await
                }
            }
        }
    }

    /// Recursively reconstructs the remote node at `remote_path` into the
    /// existing local directory `local_dir`, restoring original names,
    /// directory shape, and file contents.
    pub async fn receive(&self, local_dir: &Path, remote_path: &str) -> SyncResult<()> {
        if !local_dir.is_dir() {
            return Err(SyncError::InvalidTarget(format!(
                "local destination '{}' is missing or not a directory",
                local_dir.display()
            )));
        }

        let remote_path = self.resolve_remote(remote_path);
        info!(remote = %remote_path, local = %local_dir.display(), "receive starting");

        let probe = self.connector.patch(&remote_path, MetadataBag::new()).await?;
        if !probe.kind.is_dir() {
            return self.receive_file(&remote_path, local_dir).await;
        }

        // Depth-first pre-order over the remote tree: the local directory
        // for a node always exists before its children are fetched.
        let mut stack = vec![(remote_path, local_dir.to_path_buf())];
        while let Some((remote_dir, local_dir)) = stack.pop() {
            let index = self.build_index(&remote_dir).await?;

            for original_name in index.original_names() {
                // First-listed representative among duplicates.
                let Some(remote_id) = index.first_id_for(original_name) else {
                    continue;
                };
                let Some(node) = index.node(remote_id) else {
                    continue;
                };

                if node.kind.is_dir() {
                    let child_local = local_dir.join(original_name);
                    debug!(dir = %original_name, id = %remote_id, "receiving directory");
                    tokio::fs::create_dir_all(&child_local).await?;
                    stack.push((paths::join(&remote_dir, remote_id), child_local));
                } else {
                    self.receive_file(&paths::join(&remote_dir, remote_id), &local_dir)
                        .await?;
                }
            }
        }

        Ok(())
    }

    /// Deletes the remote node at `remote_path`.
    ///
    /// The node and its attached metadata bag go together; no bookkeeping
    /// survives on the engine side. `permanently = false` requests a
    /// trash-style delete where the store supports one.
    pub async fn remove(&self, remote_path: &str, permanently: bool) -> SyncResult<()> {
        let remote_path = self.resolve_remote(remote_path);
        info!(remote = %remote_path, permanently, "removing");
        self.connector.remove(&remote_path, permanently).await?;
        Ok(())
    }

    fn resolve_remote(&self, path: &str) -> String {
        paths::resolve(&self.app_base_path, path)
    }

    /// Existence-and-type probe for a send target. A property probe, not
    /// a listing, so a missing path and a file path both fail cleanly.
    async fn probe_remote_dir(&self, remote_dir: &str) -> SyncResult<()> {
        let entry = self
            .connector
            .patch(remote_dir, MetadataBag::new())
            .await
            .map_err(|e| match e {
                veilsync_connector::ConnectorError::NotFound(p) => SyncError::InvalidTarget(
                    format!("remote target directory '{p}' does not exist"),
                ),
                other => SyncError::Connector(other),
            })?;

        if !entry.kind.is_dir() {
            return Err(SyncError::InvalidTarget(format!(
                "remote target '{remote_dir}' is not a directory"
            )));
        }
        Ok(())
    }

    async fn build_index(&self, remote_dir: &str) -> SyncResult<DirectoryIndex> {
        DirectoryIndex::build(
            self.connector.as_ref(),
            &self.codec,
            remote_dir,
            &self.app_base_path,
        )
        .await
    }

    /// Depth-first pre-order walk of a local directory tree.
    async fn send_tree(&self, root: &Path, remote_root: &str) -> SyncResult<()> {
        let mut translations = PathTranslationMap::new();
        translations.record(root.to_path_buf(), remote_root.to_string());

        let mut stack = vec![root.to_path_buf()];
        while let Some(local_dir) = stack.pop() {
            // Recorded when the directory was decided; pre-order makes
            // this lookup infallible.
            let Some(remote_dir) = translations.resolve(&local_dir).map(str::to_string) else {
                continue;
            };

            let index = self.build_index(&remote_dir).await?;
            let (subdirs, files) = partition_children(&local_dir).await?;

            for subdir in &subdirs {
                let name = base_name(subdir)?;
                let remote_child = match index.first_id_for(&name) {
                    Some(id) => {
                        debug!(dir = %name, id = %id, "already on remote, reusing identifier");
                        paths::join(&remote_dir, id)
                    }
                    None => {
                        let remote_id = Uuid::new_v4().to_string();
                        let remote_child = paths::join(&remote_dir, &remote_id);
                        // On-disk size of the directory entry itself, not
                        // a recursive total.
                        let size = tokio::fs::metadata(subdir).await?.len();

                        debug!(dir = %name, id = %remote_id, "creating remote directory");
                        self.connector.mkdir(&remote_child).await?;
                        let bag = self.codec.encode(&name, size)?;
                        self.connector.patch(&remote_child, bag).await?;
                        remote_child
                    }
                };
                translations.record(subdir.clone(), remote_child);
            }

            for file in &files {
                let name = base_name(file)?;
                if index.contains_name(&name) {
                    debug!(file = %name, "already on remote, skipping");
                } else {
                    self.send_file(file, &remote_dir).await?;
                }
            }

            // Reverse so the traversal visits siblings in listing order.
            stack.extend(subdirs.into_iter().rev());
        }

        debug!(directories = translations.len(), "send complete");
        Ok(())
    }

    /// Uploads one file: encrypt as a single block, stage under the fresh
    /// remote identifier, transfer, attach encrypted identity.
    async fn send_file(&self, local_file: &Path, remote_dir: &str) -> SyncResult<()> {
        let name = base_name(local_file)?;
        let size = tokio::fs::metadata(local_file).await?.len();
        let remote_id = Uuid::new_v4().to_string();
        let remote_path = paths::join(remote_dir, &remote_id);

        let plaintext = tokio::fs::read(local_file).await?;
        let ciphertext = self.cipher.encrypt(&plaintext)?;

        // The staged ciphertext is removed on every exit path below,
        // upload failure included.
        let staged = StagedFile::create(std::env::temp_dir().join(&remote_id), &ciphertext)?;

        debug!(file = %local_file.display(), id = %remote_id, "sending file");
        let staged_bytes = staged.read()?;
        self.connector.upload(staged_bytes, &remote_path).await?;

        let bag = self.codec.encode(&name, size)?;
        self.connector.patch(&remote_path, bag).await?;
        Ok(())
    }

    /// Downloads one file: fetch raw ciphertext under its remote
    /// identifier, decrypt, write under the recovered original name.
    ///
    /// Decode and decrypt failures abort this file and propagate; no
    /// partially decrypted or misnamed plaintext is ever left behind.
    async fn receive_file(&self, remote_path: &str, local_dir: &Path) -> SyncResult<()> {
        let probe = self.connector.patch(remote_path, MetadataBag::new()).await?;
        let (original_name, _size) = self.codec.decode(&probe.metadata).map_err(|e| {
            if e.is_authentication() {
                SyncError::Authentication
            } else {
                SyncError::Metadata(e)
            }
        })?;

        let staged = StagedFile::adopt(local_dir.join(&probe.name));
        self.connector.download(remote_path, staged.path()).await?;
        let ciphertext = staged.read()?;
        drop(staged);

        let plaintext = self.cipher.decrypt(&ciphertext)?;
        let target = local_dir.join(&original_name);
        debug!(file = %target.display(), id = %probe.name, "receiving file");
        tokio::fs::write(&target, plaintext).await?;
        Ok(())
    }
}

/// UTF-8 base name of a local path.
fn base_name(path: &Path) -> SyncResult<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            SyncError::InvalidTarget(format!(
                "path '{}' has no valid UTF-8 base name",
                path.display()
            ))
        })
}

/// Immediate children of `dir`, split into sorted subdirectory and file
/// lists. Sorting keeps the walk order deterministic across platforms.
async fn partition_children(dir: &Path) -> SyncResult<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut subdirs = Vec::new();
    let mut files = Vec::new();

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            subdirs.push(entry.path());
        } else {
            files.push(entry.path());
        }
    }

    subdirs.sort();
    files.sort();
    Ok((subdirs, files))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_map_records_and_resolves() {
        let mut map = PathTranslationMap::new();
        map.record(PathBuf::from("/tmp/a"), "/Applications/demo/uuid-1".to_string());

        assert_eq!(
            map.resolve(Path::new("/tmp/a")),
            Some("/Applications/demo/uuid-1")
        );
        assert_eq!(map.resolve(Path::new("/tmp/b")), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn classify_distinguishes_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.txt");
        std::fs::write(&file, b"x").unwrap();

        assert!(matches!(
            LocalNode::classify(dir.path()).unwrap(),
            LocalNode::Dir(_)
        ));
        assert!(matches!(
            LocalNode::classify(&file).unwrap(),
            LocalNode::File(_)
        ));
    }

    #[test]
    fn classify_missing_path_is_an_io_error() {
        assert!(matches!(
            LocalNode::classify(Path::new("/definitely/not/here")),
            Err(SyncError::Io(_))
        ));
    }
}
