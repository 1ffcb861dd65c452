//! Vector Store Proxy (C16), grounded on `vector_db_proxy_lambda.py`: routes
//! by `storage_mode` to the Elasticsearch-equivalent backend (when the mode
//! starts with `es`/`elastic`) or the Milvus-equivalent backend otherwise,
//! then applies the same post-search metadata filters `milvus_handler_lambda.py`'s
//! `_search` runs after the raw similarity search comes back.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use idp_core::error::IdpError;

use super::backend::VectorStoreBackend;
use super::ephemeral::EphemeralRegistry;
use super::types::{SearchResult, VectorItem};

/// Optional metadata filters applied after the raw similarity search,
/// mirroring the filter kwargs `milvus_handler_lambda.py`'s search
/// operation accepts alongside the query embedding.
#[derive(Debug, Default, Deserialize)]
pub struct SearchFilters {
    pub department: Option<String>,
    pub team: Option<String>,
    pub user: Option<String>,
    pub entities: Option<Vec<String>>,
    pub file_guid: Option<String>,
    pub file_name: Option<String>,
}

impl SearchFilters {
    fn is_empty(&self) -> bool {
        self.department.is_none()
            && self.team.is_none()
            && self.user.is_none()
            && self.entities.is_none()
            && self.file_guid.is_none()
            && self.file_name.is_none()
    }

    fn matches(&self, metadata: &serde_json::Value) -> bool {
        if let Some(department) = &self.department {
            if metadata.get("department").and_then(|v| v.as_str()) != Some(department.as_str()) {
                return false;
            }
        }
        if let Some(team) = &self.team {
            if metadata.get("team").and_then(|v| v.as_str()) != Some(team.as_str()) {
                return false;
            }
        }
        if let Some(user) = &self.user {
            if metadata.get("user").and_then(|v| v.as_str()) != Some(user.as_str()) {
                return false;
            }
        }
        if let Some(file_guid) = &self.file_guid {
            if metadata.get("file_guid").and_then(|v| v.as_str()) != Some(file_guid.as_str()) {
                return false;
            }
        }
        if let Some(file_name) = &self.file_name {
            if metadata.get("file_name").and_then(|v| v.as_str()) != Some(file_name.as_str()) {
                return false;
            }
        }
        if let Some(entities) = &self.entities {
            let chunk_entities: Vec<String> = metadata
                .get("entities")
                .and_then(|v| v.as_array())
                .map(|arr| arr.iter().filter_map(|e| e.as_str().map(str::to_string)).collect())
                .unwrap_or_default();
            if !entities.iter().any(|e| chunk_entities.contains(e)) {
                return false;
            }
        }
        true
    }
}

fn is_elasticsearch_mode(storage_mode: Option<&str>) -> bool {
    match storage_mode {
        Some(mode) => {
            let lower = mode.to_lowercase();
            lower.starts_with("es") || lower.starts_with("elastic")
        }
        None => false,
    }
}

pub struct VectorStoreProxy {
    milvus: Arc<dyn VectorStoreBackend>,
    elasticsearch: Arc<dyn VectorStoreBackend>,
    pub(crate) ephemeral: EphemeralRegistry,
}

impl VectorStoreProxy {
    pub fn new(milvus: Arc<dyn VectorStoreBackend>, elasticsearch: Arc<dyn VectorStoreBackend>) -> Self {
        Self { milvus, elasticsearch, ephemeral: EphemeralRegistry::default() }
    }

    fn backend_for(&self, storage_mode: Option<&str>) -> &Arc<dyn VectorStoreBackend> {
        if is_elasticsearch_mode(storage_mode) {
            &self.elasticsearch
        } else {
            &self.milvus
        }
    }

    pub async fn insert(
        &self,
        collection: &str,
        items: Vec<VectorItem>,
        upsert: bool,
        storage_mode: Option<&str>,
    ) -> Result<usize, IdpError> {
        self.backend_for(storage_mode).insert(collection, items, upsert).await
    }

    pub async fn update(&self, collection: &str, items: Vec<VectorItem>, storage_mode: Option<&str>) -> Result<usize, IdpError> {
        self.backend_for(storage_mode).update(collection, items).await
    }

    pub async fn delete(&self, collection: &str, ids: &[i64], storage_mode: Option<&str>) -> Result<usize, IdpError> {
        self.backend_for(storage_mode).delete(collection, ids).await
    }

    /// Creates a collection. When `ephemeral_ttl` is set, registers it with
    /// the reaper so it is dropped once past its expiry.
    pub async fn create_collection(
        &self,
        collection: &str,
        dim: usize,
        storage_mode: Option<&str>,
        ephemeral_expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), IdpError> {
        self.backend_for(storage_mode).create_collection(collection, dim).await?;
        if let Some(expires_at) = ephemeral_expires_at {
            self.ephemeral.register(collection, expires_at);
        }
        Ok(())
    }

    pub async fn drop_collection(&self, collection: &str, storage_mode: Option<&str>) -> Result<(), IdpError> {
        self.backend_for(storage_mode).drop_collection(collection).await?;
        self.ephemeral.deregister(collection);
        Ok(())
    }

    pub async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
        storage_mode: Option<&str>,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchResult>, IdpError> {
        let matches = self.backend_for(storage_mode).search(collection, embedding, top_k).await?;
        Ok(apply_filters(matches, filters))
    }

    pub async fn hybrid_search(
        &self,
        collection: &str,
        embedding: &[f32],
        keywords: &[String],
        top_k: usize,
        storage_mode: Option<&str>,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchResult>, IdpError> {
        let matches = self
            .backend_for(storage_mode)
            .hybrid_search(collection, embedding, keywords, top_k)
            .await?;
        Ok(apply_filters(matches, filters))
    }
}

fn apply_filters(matches: Vec<SearchResult>, filters: &SearchFilters) -> Vec<SearchResult> {
    if filters.is_empty() {
        return matches;
    }
    matches.into_iter().filter(|m| filters.matches(&m.metadata)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::milvus_equiv::MilvusEquivalentBackend;

    #[tokio::test]
    async fn search_filters_by_department() {
        let milvus = Arc::new(MilvusEquivalentBackend::default());
        let es = Arc::new(MilvusEquivalentBackend::default());
        let proxy = VectorStoreProxy::new(milvus, es);
        proxy.create_collection("docs", 2, None, None).await.unwrap();
        proxy
            .insert(
                "docs",
                vec![
                    VectorItem { id: None, embedding: vec![0.0, 0.0], metadata: serde_json::json!({"department": "legal"}) },
                    VectorItem { id: None, embedding: vec![0.0, 0.1], metadata: serde_json::json!({"department": "hr"}) },
                ],
                false,
                None,
            )
            .await
            .unwrap();

        let filters = SearchFilters { department: Some("legal".to_string()), ..Default::default() };
        let results = proxy.search("docs", &[0.0, 0.0], 10, None, &filters).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metadata["department"], "legal");
    }

    #[test]
    fn elasticsearch_mode_detection_is_case_insensitive_and_prefix_based() {
        assert!(is_elasticsearch_mode(Some("ES")));
        assert!(is_elasticsearch_mode(Some("elastic-search")));
        assert!(!is_elasticsearch_mode(Some("milvus")));
        assert!(!is_elasticsearch_mode(None));
    }
}
