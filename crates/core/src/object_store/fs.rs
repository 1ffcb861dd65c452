//! Filesystem-rooted `ObjectStore` backend: each bucket is a subdirectory of
//! `root`, keys map directly onto relative paths. Grounded on the document
//! storage layout the corpus already uses for content-addressed files —
//! generalized here to a flat bucket/key scheme since the IDP pipeline
//! addresses objects by a fixed, prefix-driven layout rather than by hash.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::{content_hash, ListPage, ListedObject, ObjectMeta, ObjectStore};
use crate::error::IdpError;

pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }

    fn tags_path_for(&self, bucket: &str, key: &str) -> PathBuf {
        self.path_for(bucket, key)
            .with_extension(format!("{}.tags.json", extension_or_empty(key)))
    }
}

fn extension_or_empty(key: &str) -> &str {
    Path::new(key).extension().and_then(|e| e.to_str()).unwrap_or("")
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, IdpError> {
        let path = self.path_for(bucket, key);
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IdpError::NotFound(format!("{bucket}/{key}"))
            } else {
                IdpError::BackendUnavailable(e.to_string())
            }
        })
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), IdpError> {
        let path = self.path_for(bucket, key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| IdpError::BackendUnavailable(e.to_string()))?;
        }
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| IdpError::BackendUnavailable(e.to_string()))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| IdpError::BackendUnavailable(e.to_string()))?;
        Ok(())
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>, IdpError> {
        let path = self.path_for(bucket, key);
        match tokio::fs::metadata(&path).await {
            Ok(meta) => {
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|e| IdpError::BackendUnavailable(e.to_string()))?;
                Ok(Some(ObjectMeta {
                    content_length: meta.len(),
                    etag: content_hash(&bytes),
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(IdpError::BackendUnavailable(e.to_string())),
        }
    }

    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        _continuation: Option<&str>,
    ) -> Result<ListPage, IdpError> {
        let root = self.root.join(bucket);
        let prefix_path = root.join(prefix);
        let mut objects = Vec::new();
        if prefix_path.exists() {
            let mut stack = vec![prefix_path.clone()];
            while let Some(dir) = stack.pop() {
                let mut entries = tokio::fs::read_dir(&dir)
                    .await
                    .map_err(|e| IdpError::BackendUnavailable(e.to_string()))?;
                while let Some(entry) = entries
                    .next_entry()
                    .await
                    .map_err(|e| IdpError::BackendUnavailable(e.to_string()))?
                {
                    let path = entry.path();
                    if path.is_dir() {
                        stack.push(path);
                    } else if let Ok(meta) = entry.metadata().await {
                        if let Ok(rel) = path.strip_prefix(&root) {
                            objects.push(ListedObject {
                                key: rel.to_string_lossy().replace('\\', "/"),
                                size: meta.len(),
                            });
                        }
                    }
                }
            }
        }
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(ListPage {
            objects,
            continuation: None,
        })
    }

    async fn tag(
        &self,
        bucket: &str,
        key: &str,
        tags: HashMap<String, String>,
    ) -> Result<(), IdpError> {
        let path = self.tags_path_for(bucket, key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| IdpError::BackendUnavailable(e.to_string()))?;
        }
        let json = serde_json::to_vec(&tags).map_err(|e| IdpError::Other(e.into()))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| IdpError::BackendUnavailable(e.to_string()))
    }

    async fn get_tags(&self, bucket: &str, key: &str) -> Result<HashMap<String, String>, IdpError> {
        let path = self.tags_path_for(bucket, key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| IdpError::Other(e.into())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(IdpError::BackendUnavailable(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_head_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        store
            .put("bucket", "raw/a.pdf", b"hello".to_vec(), "application/pdf")
            .await
            .unwrap();
        let bytes = store.get("bucket", "raw/a.pdf").await.unwrap();
        assert_eq!(bytes, b"hello");
        let meta = store.head("bucket", "raw/a.pdf").await.unwrap().unwrap();
        assert_eq!(meta.content_length, 5);
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        let err = store.get("bucket", "missing.txt").await.unwrap_err();
        assert!(matches!(err, IdpError::NotFound(_)));
    }

    #[tokio::test]
    async fn copy_verifies_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        store
            .put("bucket", "src.txt", b"data".to_vec(), "text/plain")
            .await
            .unwrap();
        store.copy("bucket", "src.txt", "dst.txt").await.unwrap();
        assert_eq!(store.get("bucket", "dst.txt").await.unwrap(), b"data");
    }
}
