//! In-memory `ObjectStore` for unit tests: avoids touching the filesystem
//! while exercising stage logic.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{content_hash, ListPage, ListedObject, ObjectMeta, ObjectStore};
use crate::error::IdpError;

#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<(String, String), Vec<u8>>>,
    tags: RwLock<HashMap<(String, String), HashMap<String, String>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, IdpError> {
        self.objects
            .read()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| IdpError::NotFound(format!("{bucket}/{key}")))
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), IdpError> {
        self.objects
            .write()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), bytes);
        Ok(())
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>, IdpError> {
        Ok(self
            .objects
            .read()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|bytes| ObjectMeta {
                content_length: bytes.len() as u64,
                etag: content_hash(bytes),
            }))
    }

    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        _continuation: Option<&str>,
    ) -> Result<ListPage, IdpError> {
        let mut objects: Vec<ListedObject> = self
            .objects
            .read()
            .unwrap()
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .map(|((_, k), v)| ListedObject {
                key: k.clone(),
                size: v.len() as u64,
            })
            .collect();
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
        self.tags
            .write()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), tags);
        Ok(())
    }

    async fn get_tags(&self, bucket: &str, key: &str) -> Result<HashMap<String, String>, IdpError> {
        Ok(self
            .tags
            .read()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}
