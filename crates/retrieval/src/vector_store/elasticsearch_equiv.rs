//! Hybrid-search backend, grounded on `elastic_search_handler_lambda.py`'s
//! `ElasticsearchClient`-wrapped operations. Unlike Milvus, Elasticsearch's
//! wire protocol is a plain REST API, so this talks to a real cluster via
//! `reqwest` rather than standing in for one.

use async_trait::async_trait;
use serde_json::{json, Value};

use idp_core::error::IdpError;

use super::backend::VectorStoreBackend;
use super::types::{SearchResult, VectorItem};

pub struct ElasticsearchEquivalentBackend {
    client: reqwest::Client,
    base_url: String,
}

impl Default for ElasticsearchEquivalentBackend {
    fn default() -> Self {
        let base_url = std::env::var("ELASTICSEARCH_URL").unwrap_or_else(|_| "http://localhost:9200".to_string());
        Self { client: reqwest::Client::new(), base_url }
    }
}

impl ElasticsearchEquivalentBackend {
    fn index_url(&self, collection: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), collection)
    }
}

#[async_trait]
impl VectorStoreBackend for ElasticsearchEquivalentBackend {
    async fn insert(&self, collection: &str, items: Vec<VectorItem>, upsert: bool) -> Result<usize, IdpError> {
        if items.is_empty() {
            return Ok(0);
        }
        let mut body = String::new();
        for item in &items {
            let action = if let Some(id) = item.id {
                if upsert {
                    json!({"index": {"_index": collection, "_id": id}})
                } else {
                    json!({"create": {"_index": collection, "_id": id}})
                }
            } else {
                json!({"index": {"_index": collection}})
            };
            body.push_str(&action.to_string());
            body.push('\n');
            body.push_str(&json!({"embedding": item.embedding, "metadata": item.metadata}).to_string());
            body.push('\n');
        }

        let resp = self
            .client
            .post(format!("{}/_bulk", self.base_url.trim_end_matches('/')))
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| IdpError::BackendUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| IdpError::BackendUnavailable(e.to_string()))?
            .json::<Value>()
            .await
            .map_err(|e| IdpError::BackendUnavailable(e.to_string()))?;

        let inserted = resp["items"].as_array().map(|a| a.len()).unwrap_or(0);
        Ok(inserted)
    }

    async fn update(&self, collection: &str, items: Vec<VectorItem>) -> Result<usize, IdpError> {
        self.insert(collection, items, true).await
    }

    async fn delete(&self, collection: &str, ids: &[i64]) -> Result<usize, IdpError> {
        let mut deleted = 0;
        for id in ids {
            let resp = self
                .client
                .delete(format!("{}/_doc/{}", self.index_url(collection), id))
                .send()
                .await
                .map_err(|e| IdpError::BackendUnavailable(e.to_string()))?;
            if resp.status().is_success() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn create_collection(&self, collection: &str, dim: usize) -> Result<(), IdpError> {
        let mapping = json!({
            "mappings": {
                "properties": {
                    "embedding": { "type": "dense_vector", "dims": dim },
                    "metadata": { "type": "object", "enabled": true },
                }
            }
        });
        self.client
            .put(self.index_url(collection))
            .json(&mapping)
            .send()
            .await
            .map_err(|e| IdpError::BackendUnavailable(e.to_string()))?;
        Ok(())
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), IdpError> {
        self.client
            .delete(self.index_url(collection))
            .send()
            .await
            .map_err(|e| IdpError::BackendUnavailable(e.to_string()))?;
        Ok(())
    }

    async fn search(&self, collection: &str, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>, IdpError> {
        let query = json!({
            "size": top_k,
            "query": {
                "script_score": {
                    "query": { "match_all": {} },
                    "script": {
                        "source": "cosineSimilarity(params.query_vector, 'embedding') + 1.0",
                        "params": { "query_vector": embedding }
                    }
                }
            }
        });
        self.run_search(collection, &query).await
    }

    async fn hybrid_search(
        &self,
        collection: &str,
        embedding: &[f32],
        keywords: &[String],
        top_k: usize,
    ) -> Result<Vec<SearchResult>, IdpError> {
        if keywords.is_empty() {
            return self.search(collection, embedding, top_k).await;
        }
        let keyword_query = keywords.join(" ");
        let query = json!({
            "size": top_k,
            "query": {
                "script_score": {
                    "query": {
                        "match": { "metadata.text": keyword_query }
                    },
                    "script": {
                        "source": "cosineSimilarity(params.query_vector, 'embedding') + 1.0",
                        "params": { "query_vector": embedding }
                    }
                }
            }
        });
        self.run_search(collection, &query).await
    }
}

impl ElasticsearchEquivalentBackend {
    async fn run_search(&self, collection: &str, query: &Value) -> Result<Vec<SearchResult>, IdpError> {
        let resp = self
            .client
            .post(format!("{}/_search", self.index_url(collection)))
            .json(query)
            .send()
            .await
            .map_err(|e| IdpError::RerankFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| IdpError::BackendUnavailable(e.to_string()))?
            .json::<Value>()
            .await
            .map_err(|e| IdpError::BackendUnavailable(e.to_string()))?;

        let hits = resp["hits"]["hits"].as_array().cloned().unwrap_or_default();
        let results = hits
            .into_iter()
            .filter_map(|hit| {
                let id = hit["_id"].as_str()?.parse::<i64>().unwrap_or(0);
                let score = hit["_score"].as_f64().unwrap_or(0.0) as f32;
                let metadata = hit["_source"]["metadata"].clone();
                Some(SearchResult { id, score, metadata })
            })
            .collect();
        Ok(results)
    }
}
