//! Retrieval Orchestrator (C19), grounded on `retrieval_lambda.py`: embeds
//! the query if no embedding was supplied, searches the vector store
//! through the proxy, optionally reranks, concatenates the surviving
//! matches' text into a single context string, and hands that plus the
//! rest of the request off to the LLM Router. Any step's failure yields an
//! empty result with an error field rather than a partially-built one, so
//! a failed search or rerank never leaks into the forwarded context.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use idp_core::error::IdpError;

use crate::embedder::Embedder;
use crate::reranker::Reranker;
use crate::vector_store::{SearchFilters, VectorStoreProxy};

#[derive(Debug, Deserialize)]
pub struct RetrievalRequest {
    pub collection_name: String,
    pub query: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub embed_model: Option<String>,
    pub department: Option<String>,
    pub team: Option<String>,
    pub user: Option<String>,
    pub storage_mode: Option<String>,
    #[serde(default = "default_search_candidates")]
    pub search_candidates: usize,
}

fn default_search_candidates() -> usize {
    10
}

#[derive(Debug, Default, Serialize)]
pub struct RetrievalResult {
    pub context: Option<String>,
    pub matches: Vec<Value>,
    pub router_payload: Option<Value>,
    pub error: Option<String>,
}

impl RetrievalResult {
    fn failed(message: impl Into<String>) -> Self {
        Self { error: Some(message.into()), ..Default::default() }
    }
}

pub struct RetrievalOrchestrator<'a> {
    embedder: &'a Embedder,
    proxy: &'a VectorStoreProxy,
    reranker: Option<&'a Reranker>,
}

impl<'a> RetrievalOrchestrator<'a> {
    pub fn new(embedder: &'a Embedder, proxy: &'a VectorStoreProxy, reranker: Option<&'a Reranker>) -> Self {
        Self { embedder, proxy, reranker }
    }

    pub async fn retrieve(&self, request: RetrievalRequest) -> RetrievalResult {
        match self.run(&request).await {
            Ok(result) => result,
            Err(err) => RetrievalResult::failed(err.to_string()),
        }
    }

    async fn run(&self, request: &RetrievalRequest) -> Result<RetrievalResult, IdpError> {
        let embedding = match &request.embedding {
            Some(embedding) => embedding.clone(),
            None => {
                let query = request
                    .query
                    .as_ref()
                    .ok_or_else(|| IdpError::InputInvalid("embedding or query required".to_string()))?;
                self.embed_query(query, request.embed_model.as_deref()).await
            }
        };

        let filters = SearchFilters {
            department: request.department.clone(),
            team: request.team.clone(),
            user: request.user.clone(),
            entities: None,
            file_guid: None,
            file_name: None,
        };

        let top_k = if self.reranker.is_some() { request.search_candidates } else { request.search_candidates.min(10) };
        let mut matches = self
            .proxy
            .search(&request.collection_name, &embedding, top_k, request.storage_mode.as_deref(), &filters)
            .await?;

        if let (Some(reranker), Some(query)) = (self.reranker, &request.query) {
            matches = reranker.rerank(query, matches, request.search_candidates).await;
        }

        let context = matches
            .iter()
            .filter_map(|m| m.metadata.get("text").and_then(|v| v.as_str()))
            .collect::<Vec<_>>()
            .join(" ");

        let router_payload = serde_json::json!({
            "collection_name": request.collection_name,
            "query": request.query,
            "department": request.department,
            "team": request.team,
            "user": request.user,
            "context": context,
        });

        Ok(RetrievalResult {
            context: Some(context),
            matches: matches.into_iter().map(|m| serde_json::to_value(m).unwrap_or(Value::Null)).collect(),
            router_payload: Some(router_payload),
            error: None,
        })
    }

    /// Embeds a query string, falling back to the embedder's hash-based
    /// stand-in on failure rather than aborting the whole retrieval —
    /// mirrors `retrieval_lambda.py`'s own `_embed_query`/`_simple_embed`
    /// fallback pair.
    async fn embed_query(&self, query: &str, embed_model: Option<&str>) -> Vec<f32> {
        match self.embedder.embed_batch(&[query.to_string()], None, embed_model).await {
            Ok(mut embeddings) if !embeddings.is_empty() => embeddings.remove(0),
            _ => crate::embedder::fallback_embed(query),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::{MilvusEquivalentBackend, VectorItem};
    use std::sync::Arc;

    #[tokio::test]
    async fn missing_embedding_and_query_fails_closed() {
        let embedder = Embedder::new("sbert", Default::default());
        let milvus = Arc::new(MilvusEquivalentBackend::default());
        let es = Arc::new(MilvusEquivalentBackend::default());
        let proxy = VectorStoreProxy::new(milvus, es);
        let orchestrator = RetrievalOrchestrator::new(&embedder, &proxy, None);

        let result = orchestrator
            .retrieve(RetrievalRequest {
                collection_name: "docs".to_string(),
                query: None,
                embedding: None,
                embed_model: None,
                department: None,
                team: None,
                user: None,
                storage_mode: None,
                search_candidates: 10,
            })
            .await;

        assert!(result.error.is_some());
        assert!(result.context.is_none());
    }

    #[tokio::test]
    async fn retrieve_builds_context_from_matches() {
        let embedder = Embedder::new("sbert", Default::default());
        let milvus = Arc::new(MilvusEquivalentBackend::default());
        let es = Arc::new(MilvusEquivalentBackend::default());
        let proxy = VectorStoreProxy::new(milvus, es);
        proxy.create_collection("docs", 32, None, None).await.unwrap();
        let embedding = crate::embedder::fallback_embed("hello");
        proxy
            .insert(
                "docs",
                vec![VectorItem { id: None, embedding: embedding.clone(), metadata: serde_json::json!({"text": "hello world"}) }],
                false,
                None,
            )
            .await
            .unwrap();

        let orchestrator = RetrievalOrchestrator::new(&embedder, &proxy, None);
        let result = orchestrator
            .retrieve(RetrievalRequest {
                collection_name: "docs".to_string(),
                query: Some("hello".to_string()),
                embedding: None,
                embed_model: None,
                department: None,
                team: None,
                user: None,
                storage_mode: None,
                search_candidates: 10,
            })
            .await;

        assert!(result.error.is_none());
        assert_eq!(result.context.unwrap(), "hello world");
    }
}
