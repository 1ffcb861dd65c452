use async_trait::async_trait;
use serde::Deserialize;

use idp_core::error::IdpError;

#[async_trait]
pub trait RerankBackend: Send + Sync {
    async fn score(&self, query: &str, docs: &[String]) -> Result<Vec<f32>, IdpError>;
}

/// Stands in for `_hf_score_pairs`'s local `CrossEncoder`. Nothing in this
/// workspace's stack runs cross-encoder inference, so relevance is
/// approximated by normalized query/document token overlap rather than a
/// learned similarity score.
pub struct LexicalOverlapBackend;

fn tokenize_lower(text: &str) -> Vec<String> {
    text.split_whitespace().map(|w| w.to_lowercase()).collect()
}

#[async_trait]
impl RerankBackend for LexicalOverlapBackend {
    async fn score(&self, query: &str, docs: &[String]) -> Result<Vec<f32>, IdpError> {
        let query_tokens: std::collections::HashSet<String> = tokenize_lower(query).into_iter().collect();
        if query_tokens.is_empty() {
            return Ok(vec![0.0; docs.len()]);
        }
        Ok(docs
            .iter()
            .map(|doc| {
                let doc_tokens: std::collections::HashSet<String> = tokenize_lower(doc).into_iter().collect();
                let overlap = query_tokens.intersection(&doc_tokens).count();
                overlap as f32 / query_tokens.len() as f32
            })
            .collect())
    }
}

#[derive(Deserialize)]
struct CohereRerankResponse {
    results: Vec<CohereRerankResult>,
}

#[derive(Deserialize)]
struct CohereRerankResult {
    index: usize,
    relevance_score: f32,
}

pub struct CohereEquivalentRerankBackend {
    client: reqwest::Client,
}

impl Default for CohereEquivalentRerankBackend {
    fn default() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

#[async_trait]
impl RerankBackend for CohereEquivalentRerankBackend {
    async fn score(&self, query: &str, docs: &[String]) -> Result<Vec<f32>, IdpError> {
        let endpoint =
            std::env::var("COHERE_RERANK_ENDPOINT").unwrap_or_else(|_| "https://api.cohere.ai/v1/rerank".to_string());
        let api_key =
            std::env::var("COHERE_API_KEY").map_err(|_| IdpError::ConfigMissing("COHERE_API_KEY".to_string()))?;

        let resp = self
            .client
            .post(&endpoint)
            .bearer_auth(api_key)
            .json(&serde_json::json!({ "query": query, "documents": docs }))
            .send()
            .await
            .map_err(|e| IdpError::RerankFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| IdpError::RerankFailed(e.to_string()))?
            .json::<CohereRerankResponse>()
            .await
            .map_err(|e| IdpError::RerankFailed(e.to_string()))?;

        let mut scores = vec![0.0; docs.len()];
        for result in resp.results {
            if result.index < scores.len() {
                scores[result.index] = result.relevance_score;
            }
        }
        Ok(scores)
    }
}

/// Generic HTTP POST to a configurable endpoint, mirroring `_nvidia_rerank`'s
/// call to an NVIDIA NIM reranking microservice.
pub struct NvidiaEquivalentRerankBackend {
    client: reqwest::Client,
}

impl Default for NvidiaEquivalentRerankBackend {
    fn default() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

#[derive(Deserialize)]
struct NvidiaRerankResponse {
    rankings: Vec<NvidiaRanking>,
}

#[derive(Deserialize)]
struct NvidiaRanking {
    index: usize,
    logit: f32,
}

#[async_trait]
impl RerankBackend for NvidiaEquivalentRerankBackend {
    async fn score(&self, query: &str, docs: &[String]) -> Result<Vec<f32>, IdpError> {
        let endpoint =
            std::env::var("NVIDIA_RERANK_ENDPOINT").map_err(|_| IdpError::ConfigMissing("NVIDIA_RERANK_ENDPOINT".to_string()))?;
        let api_key = std::env::var("NVIDIA_API_KEY").ok();

        let passages: Vec<_> = docs.iter().map(|d| serde_json::json!({ "text": d })).collect();
        let mut req = self
            .client
            .post(&endpoint)
            .json(&serde_json::json!({ "query": { "text": query }, "passages": passages }));
        if let Some(key) = api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| IdpError::RerankFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| IdpError::RerankFailed(e.to_string()))?
            .json::<NvidiaRerankResponse>()
            .await
            .map_err(|e| IdpError::RerankFailed(e.to_string()))?;

        let mut scores = vec![0.0; docs.len()];
        for ranking in resp.rankings {
            if ranking.index < scores.len() {
                scores[ranking.index] = ranking.logit;
            }
        }
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lexical_overlap_scores_exact_match_highest() {
        let backend = LexicalOverlapBackend;
        let docs = vec!["the quick brown fox".to_string(), "totally unrelated text".to_string()];
        let scores = backend.score("quick brown fox", &docs).await.unwrap();
        assert!(scores[0] > scores[1]);
    }
}
