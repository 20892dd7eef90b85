//! Thin S3 adapter implementing [`ObjectStoreConnector`].
//!
//! Mapping onto flat S3 keyspace:
//! - remote path `/a/b` -> object key `a/b`
//! - a directory is a zero-byte marker object at `a/b/`
//! - the metadata bag is the object's user metadata; updating it is a
//!   same-key `CopyObject` with `MetadataDirective::Replace`
//! - `listdir` is `ListObjectsV2` with a `/` delimiter, plus one
//!   `HeadObject` per child to fetch its bag (list responses carry no
//!   user metadata)
//!
//! S3 has no trash, so `remove(.., permanently = false)` still deletes
//! permanently (logged at debug).

use crate::error::{ConnectorError, ConnectorResult};
use crate::types::{MetadataBag, NodeKind, RemoteEntry};
use crate::ObjectStoreConnector;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::MetadataDirective;
use aws_sdk_s3::Client as S3Client;
use std::path::Path;
use tracing::debug;

/// S3-backed object store connector.
pub struct S3Connector {
    client: S3Client,
    bucket: String,
}

impl S3Connector {
    /// Builds a connector with static credentials.
    ///
    /// `endpoint_override` points at MinIO in tests and switches the
    /// client to path-style addressing.
    pub fn new(
        bucket: String,
        region: String,
        endpoint_override: Option<String>,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> Self {
        let credentials = aws_credential_types::Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "veilsync-static",
        );

        let mut config_builder = aws_sdk_s3::Config::builder()
            .region(aws_types::region::Region::new(region))
            .credentials_provider(credentials)
            .behavior_version_latest();

        if let Some(endpoint) = endpoint_override {
            config_builder = config_builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: S3Client::from_conf(config_builder.build()),
            bucket,
        }
    }

    /// Object key for a file at `remote_path`.
    fn file_key(remote_path: &str) -> String {
        remote_path
            .replace('\\', "/")
            .trim_matches('/')
            .to_string()
    }

    /// Marker key for a directory at `remote_path`.
    fn dir_key(remote_path: &str) -> String {
        format!("{}/", Self::file_key(remote_path))
    }

    /// Heads a key, returning its bag, or `None` if it does not exist.
    async fn head(&self, key: &str) -> ConnectorResult<Option<MetadataBag>> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(out) => {
                let bag = out
                    .metadata()
                    .map(|m| {
                        m.iter()
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect::<MetadataBag>()
                    })
                    .unwrap_or_default();
                Ok(Some(bag))
            }
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_not_found() {
                    Ok(None)
                } else {
                    Err(ConnectorError::Transport(format!(
                        "head failed for {key}: {service_err}"
                    )))
                }
            }
        }
    }

    /// Resolves a remote path to (key, kind, bag), preferring the
    /// directory marker.
    async fn resolve(&self, remote_path: &str) -> ConnectorResult<(String, NodeKind, MetadataBag)> {
        let dir_key = Self::dir_key(remote_path);
        if let Some(bag) = self.head(&dir_key).await? {
            return Ok((dir_key, NodeKind::Dir, bag));
        }
        let file_key = Self::file_key(remote_path);
        if let Some(bag) = self.head(&file_key).await? {
            return Ok((file_key, NodeKind::File, bag));
        }
        Err(ConnectorError::NotFound(remote_path.to_string()))
    }

    /// Rewrites a key's user metadata in place.
    async fn replace_metadata(&self, key: &str, bag: &MetadataBag) -> ConnectorResult<()> {
        let mut req = self
            .client
            .copy_object()
            .bucket(&self.bucket)
            .key(key)
            .copy_source(format!("{}/{key}", self.bucket))
            .metadata_directive(MetadataDirective::Replace);

        for (field, value) in bag.iter() {
            req = req.metadata(field, value);
        }

        req.send().await.map_err(|e| {
            ConnectorError::Transport(format!("metadata replace failed for {key}: {e}"))
        })?;
        Ok(())
    }

    fn last_segment(key: &str) -> String {
        key.trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(key)
            .to_string()
    }
}

#[async_trait]
impl ObjectStoreConnector for S3Connector {
    async fn upload(&self, data: Vec<u8>, remote_path: &str) -> ConnectorResult<()> {
        let key = Self::file_key(remote_path);
        let size = data.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| ConnectorError::Transport(format!("upload failed for {key}: {e}")))?;

        debug!("uploaded {size} bytes to s3://{}/{key}", self.bucket);
        Ok(())
    }

    async fn download(&self, remote_path: &str, local_path: &Path) -> ConnectorResult<()> {
        let key = Self::file_key(remote_path);

        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| ConnectorError::Transport(format!("download failed for {key}: {e}")))?;

        let body = resp.body.collect().await.map_err(|e| {
            ConnectorError::Transport(format!("failed to read body for {key}: {e}"))
        })?;

        let bytes = body.into_bytes();
        debug!(
            "downloaded {} bytes from s3://{}/{key}",
            bytes.len(),
            self.bucket
        );
        tokio::fs::write(local_path, bytes).await?;
        Ok(())
    }

    async fn mkdir(&self, remote_path: &str) -> ConnectorResult<()> {
        let key = Self::dir_key(remote_path);
        if self.head(&key).await?.is_some() {
            return Err(ConnectorError::AlreadyExists(remote_path.to_string()));
        }

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from_static(b""))
            .send()
            .await
            .map_err(|e| ConnectorError::Transport(format!("mkdir failed for {key}: {e}")))?;

        debug!("created directory marker s3://{}/{key}", self.bucket);
        Ok(())
    }

    async fn listdir(&self, remote_path: &str) -> ConnectorResult<Vec<RemoteEntry>> {
        let prefix = Self::dir_key(remote_path);
        if self.head(&prefix).await?.is_none() {
            return Err(ConnectorError::NotFound(remote_path.to_string()));
        }

        let resp = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&prefix)
            .delimiter("/")
            .send()
            .await
            .map_err(|e| {
                ConnectorError::Transport(format!("list failed for prefix {prefix}: {e}"))
            })?;

        let mut entries = Vec::new();

        for common in resp.common_prefixes() {
            let Some(child_prefix) = common.prefix() else {
                continue;
            };
            let bag = self.head(child_prefix).await?.unwrap_or_default();
            entries.push(RemoteEntry {
                name: Self::last_segment(child_prefix),
                kind: NodeKind::Dir,
                metadata: bag,
            });
        }

        for obj in resp.contents() {
            let Some(key) = obj.key() else { continue };
            if key == prefix {
                continue; // the directory's own marker
            }
            let bag = self.head(key).await?.unwrap_or_default();
            entries.push(RemoteEntry {
                name: Self::last_segment(key),
                kind: NodeKind::File,
                metadata: bag,
            });
        }

        Ok(entries)
    }

    async fn patch(&self, remote_path: &str, bag: MetadataBag) -> ConnectorResult<RemoteEntry> {
        let (key, kind, mut stored) = self.resolve(remote_path).await?;

        if !bag.is_empty() {
            stored.merge(&bag);
            self.replace_metadata(&key, &stored).await?;
        }

        Ok(RemoteEntry {
            name: Self::last_segment(&key),
            kind,
            metadata: stored,
        })
    }

    async fn remove(&self, remote_path: &str, permanently: bool) -> ConnectorResult<()> {
        if !permanently {
            debug!("S3 has no trash; deleting {remote_path} permanently");
        }

        let (key, kind, _) = self.resolve(remote_path).await?;

        if kind.is_dir() {
            // Delete everything under the prefix, marker included.
            let resp = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&key)
                .send()
                .await
                .map_err(|e| {
                    ConnectorError::Transport(format!("list failed for prefix {key}: {e}"))
                })?;

            for obj in resp.contents() {
                let Some(child) = obj.key() else { continue };
                self.client
                    .delete_object()
                    .bucket(&self.bucket)
                    .key(child)
                    .send()
                    .await
                    .map_err(|e| {
                        ConnectorError::Transport(format!("delete failed for {child}: {e}"))
                    })?;
            }
        } else {
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
                .map_err(|e| ConnectorError::Transport(format!("delete failed for {key}: {e}")))?;
        }

        Ok(())
    }
}
