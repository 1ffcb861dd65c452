//! Primary vector-store backend, grounded on `milvus_handler_lambda.py`'s
//! `MilvusClient`-wrapped operations. Milvus itself speaks gRPC through a
//! client SDK this workspace's dependency stack has no equivalent for,
//! so this backend reproduces the same CRUD + similarity-search contract
//! in-process: an L2-distance index per collection, mirroring the
//! source's `metric_type: "L2"` search call.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use idp_core::error::IdpError;

use super::backend::VectorStoreBackend;
use super::types::{SearchResult, VectorItem};

struct StoredItem {
    id: i64,
    embedding: Vec<f32>,
    metadata: serde_json::Value,
}

#[derive(Default)]
struct Collection {
    items: Vec<StoredItem>,
    next_id: i64,
}

pub struct MilvusEquivalentBackend {
    collections: RwLock<HashMap<String, Collection>>,
}

impl Default for MilvusEquivalentBackend {
    fn default() -> Self {
        Self { collections: RwLock::new(HashMap::new()) }
    }
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

#[async_trait]
impl VectorStoreBackend for MilvusEquivalentBackend {
    async fn insert(&self, collection: &str, items: Vec<VectorItem>, upsert: bool) -> Result<usize, IdpError> {
        let mut collections = self.collections.write().unwrap();
        let entry = collections.entry(collection.to_string()).or_default();
        let mut inserted = 0;
        for item in items {
            let id = match item.id {
                Some(existing) if upsert => {
                    if let Some(slot) = entry.items.iter_mut().find(|i| i.id == existing) {
                        slot.embedding = item.embedding.clone();
                        slot.metadata = item.metadata.clone();
                        inserted += 1;
                        continue;
                    }
                    existing
                }
                Some(explicit) => explicit,
                None => {
                    entry.next_id += 1;
                    entry.next_id
                }
            };
            entry.items.push(StoredItem {
                id,
                embedding: item.embedding,
                metadata: item.metadata,
            });
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn update(&self, collection: &str, items: Vec<VectorItem>) -> Result<usize, IdpError> {
        let mut collections = self.collections.write().unwrap();
        let Some(entry) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let mut updated = 0;
        for item in items {
            if let Some(id) = item.id {
                if let Some(slot) = entry.items.iter_mut().find(|i| i.id == id) {
                    slot.embedding = item.embedding;
                    slot.metadata = item.metadata;
                    updated += 1;
                }
            }
        }
        Ok(updated)
    }

    async fn delete(&self, collection: &str, ids: &[i64]) -> Result<usize, IdpError> {
        let mut collections = self.collections.write().unwrap();
        let Some(entry) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = entry.items.len();
        entry.items.retain(|i| !ids.contains(&i.id));
        Ok(before - entry.items.len())
    }

    async fn create_collection(&self, collection: &str, _dim: usize) -> Result<(), IdpError> {
        self.collections
            .write()
            .unwrap()
            .entry(collection.to_string())
            .or_default();
        Ok(())
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), IdpError> {
        self.collections.write().unwrap().remove(collection);
        Ok(())
    }

    async fn search(&self, collection: &str, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>, IdpError> {
        let collections = self.collections.read().unwrap();
        let Some(entry) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut scored: Vec<SearchResult> = entry
            .items
            .iter()
            .map(|item| SearchResult {
                id: item.id,
                score: l2_distance(embedding, &item.embedding),
                metadata: item.metadata.clone(),
            })
            .collect();
        scored.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn hybrid_search(
        &self,
        collection: &str,
        embedding: &[f32],
        keywords: &[String],
        top_k: usize,
    ) -> Result<Vec<SearchResult>, IdpError> {
        let mut matches = self.search(collection, embedding, top_k).await?;
        if !keywords.is_empty() {
            matches.retain(|m| {
                let text = m
                    .metadata
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_lowercase();
                keywords.iter().any(|k| text.contains(&k.to_lowercase()))
            });
        }
        matches.truncate(top_k);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_then_search_returns_nearest_first() {
        let backend = MilvusEquivalentBackend::default();
        backend.create_collection("docs", 2).await.unwrap();
        backend
            .insert(
                "docs",
                vec![
                    VectorItem { id: None, embedding: vec![0.0, 0.0], metadata: serde_json::json!({"text": "a"}) },
                    VectorItem { id: None, embedding: vec![10.0, 10.0], metadata: serde_json::json!({"text": "b"}) },
                ],
                false,
            )
            .await
            .unwrap();
        let results = backend.search("docs", &[0.1, 0.1], 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metadata["text"], "a");
    }

    #[tokio::test]
    async fn drop_collection_clears_its_items() {
        let backend = MilvusEquivalentBackend::default();
        backend.create_collection("docs", 2).await.unwrap();
        backend
            .insert("docs", vec![VectorItem { id: None, embedding: vec![1.0], metadata: serde_json::json!({}) }], false)
            .await
            .unwrap();
        backend.drop_collection("docs").await.unwrap();
        let results = backend.search("docs", &[1.0], 5).await.unwrap();
        assert!(results.is_empty());
    }
}
