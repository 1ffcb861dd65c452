//! `WorkQueue` backed directly by the Object-Store Gateway's `list`.
//!
//! The staged IDP pipeline has no contention to arbitrate — each object key
//! is only ever produced by one upstream stage and consumed by exactly one
//! downstream stage, so `claim`/`complete`/`fail` are no-ops here; the
//! interesting part is `fetch_batch`, which lists a prefix and filters by
//! extension so `PipelineRunner` can drive CLI batch commands the same way
//! the corpus drives its own polling analysis queue.

use async_trait::async_trait;

use crate::object_store::ObjectStore;

use super::handle::{ClaimId, WorkHandle};
use super::{WorkFilter, WorkQueue, WorkQueueError};

#[derive(Debug, Clone)]
pub struct ObjectKey {
    pub bucket: String,
    pub key: String,
}

pub struct ObjectQueue<S: ObjectStore> {
    store: S,
    bucket: String,
    prefix: String,
}

impl<S: ObjectStore> ObjectQueue<S> {
    pub fn new(store: S, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl<S: ObjectStore> WorkQueue for ObjectQueue<S> {
    type Item = ObjectKey;

    async fn count(&self, filter: &WorkFilter) -> Result<u64, WorkQueueError> {
        let page = self
            .store
            .list(&self.bucket, &self.prefix, None)
            .await
            .map_err(|e| WorkQueueError::Other(e.to_string()))?;
        Ok(page
            .objects
            .iter()
            .filter(|o| matches_mime_filter(&o.key, filter))
            .count() as u64)
    }

    async fn fetch_batch(
        &self,
        filter: &WorkFilter,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<Vec<ObjectKey>, WorkQueueError> {
        let page = self
            .store
            .list(&self.bucket, &self.prefix, cursor)
            .await
            .map_err(|e| WorkQueueError::Other(e.to_string()))?;
        Ok(page
            .objects
            .into_iter()
            .filter(|o| matches_mime_filter(&o.key, filter))
            .take(limit)
            .map(|o| ObjectKey {
                bucket: self.bucket.clone(),
                key: o.key,
            })
            .collect())
    }

    async fn claim(
        &self,
        item: &ObjectKey,
        _filter: &WorkFilter,
    ) -> Result<WorkHandle<ObjectKey>, WorkQueueError> {
        Ok(WorkHandle::new(item.clone(), ClaimId::None))
    }

    async fn complete(&self, handle: WorkHandle<ObjectKey>) -> Result<(), WorkQueueError> {
        handle.consume();
        Ok(())
    }

    async fn fail(
        &self,
        handle: WorkHandle<ObjectKey>,
        _error: &str,
        _requeue: bool,
    ) -> Result<(), WorkQueueError> {
        handle.consume();
        Ok(())
    }
}

fn matches_mime_filter(key: &str, filter: &WorkFilter) -> bool {
    match &filter.mime_type {
        Some(ext) => key.ends_with(ext.as_str()),
        None => true,
    }
}
