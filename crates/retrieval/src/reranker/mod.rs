//! Reranker (C18), grounded on `rerank_lambda.py`: scores each candidate
//! match against the query with the configured provider, then sorts
//! descending and truncates to `top_k`. Scoring failures fall back to an
//! all-zero score vector rather than failing the request, matching the
//! source's `[0.0] * len(docs)` fallback.

mod backend;

use std::sync::Arc;

pub use backend::{CohereEquivalentRerankBackend, LexicalOverlapBackend, NvidiaEquivalentRerankBackend, RerankBackend};

use crate::vector_store::SearchResult;

pub struct Reranker {
    backend: Arc<dyn RerankBackend>,
}

impl Reranker {
    pub fn new(backend: Arc<dyn RerankBackend>) -> Self {
        Self { backend }
    }

    pub fn from_provider(provider: &str) -> Self {
        let backend: Arc<dyn RerankBackend> = match provider {
            "cohere" => Arc::new(CohereEquivalentRerankBackend::default()),
            "nvidia" => Arc::new(NvidiaEquivalentRerankBackend::default()),
            _ => Arc::new(LexicalOverlapBackend),
        };
        Self::new(backend)
    }

    /// Reranks `matches` against `query`, returning them sorted by
    /// descending score and truncated to `top_k`. A stable sort preserves
    /// the original retrieval order among ties (including an all-zero
    /// fallback after a scoring failure).
    pub async fn rerank(&self, query: &str, matches: Vec<SearchResult>, top_k: usize) -> Vec<SearchResult> {
        let docs: Vec<String> = matches
            .iter()
            .map(|m| m.metadata.get("text").and_then(|v| v.as_str()).unwrap_or("").to_string())
            .collect();

        let scores = match self.backend.score(query, &docs).await {
            Ok(scores) => scores,
            Err(_) => vec![0.0; matches.len()],
        };

        let mut scored: Vec<SearchResult> = matches
            .into_iter()
            .zip(scores)
            .map(|(mut m, s)| {
                m.score = s;
                m
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn rerank_sorts_descending_and_truncates() {
        let reranker = Reranker::new(Arc::new(LexicalOverlapBackend));
        let matches = vec![
            SearchResult { id: 1, score: 0.0, metadata: json!({"text": "totally unrelated"}) },
            SearchResult { id: 2, score: 0.0, metadata: json!({"text": "rust programming language"}) },
        ];
        let reranked = reranker.rerank("rust programming", matches, 1).await;
        assert_eq!(reranked.len(), 1);
        assert_eq!(reranked[0].id, 2);
    }
}
