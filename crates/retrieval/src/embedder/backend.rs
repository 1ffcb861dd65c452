use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use idp_core::error::IdpError;

#[async_trait]
pub trait EmbedBackend: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IdpError>;
}

/// Stands in for a local SentenceTransformer encode. Nothing in this
/// workspace's stack runs ONNX/PyTorch inference, so this mirrors
/// `retrieval_lambda.py`'s own `_simple_embed` fallback rather than the
/// primary `sentence-transformers` path: a deterministic hash-derived
/// vector, stable across calls for the same text and suitable for tests
/// and offline/local runs.
pub struct SbertEquivalentBackend;

#[async_trait]
impl EmbedBackend for SbertEquivalentBackend {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IdpError> {
        let digest = Sha256::digest(text.as_bytes());
        Ok(digest.iter().take(32).map(|b| *b as f32 / 255.0).collect())
    }
}

#[derive(Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingItem>,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingItem {
    embedding: Vec<f32>,
}

pub struct OpenAiEquivalentBackend {
    client: reqwest::Client,
}

impl Default for OpenAiEquivalentBackend {
    fn default() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

#[async_trait]
impl EmbedBackend for OpenAiEquivalentBackend {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IdpError> {
        let endpoint = std::env::var("OPENAI_EMBED_ENDPOINT")
            .unwrap_or_else(|_| "https://api.openai.com/v1/embeddings".to_string());
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| IdpError::ConfigMissing("OPENAI_API_KEY".to_string()))?;
        let model = std::env::var("OPENAI_EMBED_MODEL")
            .unwrap_or_else(|_| "text-embedding-ada-002".to_string());

        let resp = self
            .client
            .post(&endpoint)
            .bearer_auth(api_key)
            .json(&serde_json::json!({ "input": [text], "model": model }))
            .send()
            .await
            .map_err(|e| IdpError::EmbedFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| IdpError::EmbedFailed(e.to_string()))?
            .json::<OpenAiEmbeddingResponse>()
            .await
            .map_err(|e| IdpError::EmbedFailed(e.to_string()))?;

        resp.data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| IdpError::EmbedFailed("empty embedding response".to_string()))
    }
}

#[derive(Deserialize)]
struct CohereEmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}

pub struct CohereEquivalentBackend {
    client: reqwest::Client,
}

impl Default for CohereEquivalentBackend {
    fn default() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

#[async_trait]
impl EmbedBackend for CohereEquivalentBackend {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IdpError> {
        let endpoint = std::env::var("COHERE_EMBED_ENDPOINT")
            .unwrap_or_else(|_| "https://api.cohere.ai/v1/embed".to_string());
        let api_key = std::env::var("COHERE_API_KEY")
            .map_err(|_| IdpError::ConfigMissing("COHERE_API_KEY".to_string()))?;

        let resp = self
            .client
            .post(&endpoint)
            .bearer_auth(api_key)
            .json(&serde_json::json!({ "texts": [text] }))
            .send()
            .await
            .map_err(|e| IdpError::EmbedFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| IdpError::EmbedFailed(e.to_string()))?
            .json::<CohereEmbeddingResponse>()
            .await
            .map_err(|e| IdpError::EmbedFailed(e.to_string()))?;

        resp.embeddings
            .into_iter()
            .next()
            .ok_or_else(|| IdpError::EmbedFailed("empty embedding response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sbert_equivalent_is_deterministic() {
        let backend = SbertEquivalentBackend;
        let a = backend.embed("hello world").await.unwrap();
        let b = backend.embed("hello world").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }
}
