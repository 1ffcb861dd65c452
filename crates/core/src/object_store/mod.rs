//! Object-Store Gateway (C2).
//!
//! A narrow async trait fronting the pipeline's single external dependency
//! on blob storage, plus a filesystem-rooted backend for local runs and an
//! in-memory backend for tests.

mod fs;
mod memory;

pub use fs::FsObjectStore;
pub use memory::InMemoryObjectStore;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::IdpError;

#[derive(Debug, Clone)]
pub struct ObjectMeta {
    pub content_length: u64,
    /// Opaque content identifier (ETag-equivalent); two objects with equal
    /// content MUST have equal `etag`.
    pub etag: String,
}

#[derive(Debug, Clone)]
pub struct ListedObject {
    pub key: String,
    pub size: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub objects: Vec<ListedObject>,
    pub continuation: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, IdpError>;

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), IdpError>;

    async fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>, IdpError>;

    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage, IdpError>;

    async fn tag(
        &self,
        bucket: &str,
        key: &str,
        tags: HashMap<String, String>,
    ) -> Result<(), IdpError>;

    async fn get_tags(&self, bucket: &str, key: &str) -> Result<HashMap<String, String>, IdpError>;

    /// Copies `src_key` to `dst_key` within `bucket`, then verifies the copy
    /// by comparing `head` metadata. Mismatch fails with `CopyVerificationFailed`.
    async fn copy(&self, bucket: &str, src_key: &str, dst_key: &str) -> Result<(), IdpError> {
        let src_meta = self
            .head(bucket, src_key)
            .await?
            .ok_or_else(|| IdpError::NotFound(format!("{bucket}/{src_key}")))?;
        let bytes = self.get(bucket, src_key).await?;
        let content_type = "application/octet-stream";
        self.put(bucket, dst_key, bytes, content_type).await?;
        let dst_meta = self
            .head(bucket, dst_key)
            .await?
            .ok_or_else(|| IdpError::CopyVerificationFailed(dst_key.to_string()))?;
        if dst_meta.content_length != src_meta.content_length || dst_meta.etag != src_meta.etag {
            return Err(IdpError::CopyVerificationFailed(dst_key.to_string()));
        }
        Ok(())
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, IdpError> {
        Ok(self.head(bucket, key).await?.is_some())
    }
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, IdpError> {
        (**self).get(bucket, key).await
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), IdpError> {
        (**self).put(bucket, key, bytes, content_type).await
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>, IdpError> {
        (**self).head(bucket, key).await
    }

    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage, IdpError> {
        (**self).list(bucket, prefix, continuation).await
    }

    async fn tag(
        &self,
        bucket: &str,
        key: &str,
        tags: HashMap<String, String>,
    ) -> Result<(), IdpError> {
        (**self).tag(bucket, key, tags).await
    }

    async fn get_tags(&self, bucket: &str, key: &str) -> Result<HashMap<String, String>, IdpError> {
        (**self).get_tags(bucket, key).await
    }
}

/// Canonicalizes a prefix so it always ends with `/`, matching the Stage
/// Dispatcher's contract (C4).
pub fn canonicalize_prefix(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{prefix}/")
    }
}

pub fn content_hash(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(bytes))
}
