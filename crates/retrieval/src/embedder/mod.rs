//! Embedder (C15): selects a backend per `(docType -> model)` map, falling
//! back to a configured default, and embeds a batch of chunks.

mod backend;

use std::collections::HashMap;
use std::sync::Arc;

use idp_core::error::IdpError;

pub use backend::{CohereEquivalentBackend, EmbedBackend, OpenAiEquivalentBackend, SbertEquivalentBackend};

/// Last-resort embedding used by callers (the Retrieval Orchestrator's
/// query embedding step) when the configured backend call itself fails,
/// rather than the batch failing outright. Mirrors `retrieval_lambda.py`'s
/// own `_simple_embed` fallback.
pub fn fallback_embed(text: &str) -> Vec<f32> {
    use sha2::{Digest, Sha256};
    Sha256::digest(text.as_bytes()).iter().take(32).map(|b| *b as f32 / 255.0).collect()
}

pub struct Embedder {
    default_model: String,
    model_map: HashMap<String, String>,
    backends: HashMap<String, Arc<dyn EmbedBackend>>,
}

impl Embedder {
    pub fn new(default_model: impl Into<String>, model_map: HashMap<String, String>) -> Self {
        let mut backends: HashMap<String, Arc<dyn EmbedBackend>> = HashMap::new();
        backends.insert("sbert".to_string(), Arc::new(SbertEquivalentBackend));
        backends.insert("sentence".to_string(), Arc::new(SbertEquivalentBackend));
        backends.insert("openai".to_string(), Arc::new(OpenAiEquivalentBackend::default()));
        backends.insert("cohere".to_string(), Arc::new(CohereEquivalentBackend::default()));
        Self {
            default_model: default_model.into(),
            model_map,
            backends,
        }
    }

    fn model_for(&self, doc_type: Option<&str>, explicit_model: Option<&str>) -> String {
        if let Some(m) = explicit_model {
            return m.to_string();
        }
        doc_type
            .and_then(|t| self.model_map.get(t))
            .cloned()
            .unwrap_or_else(|| self.default_model.clone())
    }

    /// Embeds every text in `texts`; on any backend failure, the whole
    /// batch fails (mirrors `embed-lambda`'s `lambda_handler`, which
    /// returns `{"error": ...}` on the first exception rather than
    /// partial results).
    pub async fn embed_batch(
        &self,
        texts: &[String],
        doc_type: Option<&str>,
        explicit_model: Option<&str>,
    ) -> Result<Vec<Vec<f32>>, IdpError> {
        let model = self.model_for(doc_type, explicit_model);
        let backend = self
            .backends
            .get(&model)
            .cloned()
            .unwrap_or_else(|| Arc::new(SbertEquivalentBackend));

        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(backend.embed(text).await?);
        }
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_model_routes_to_sbert_equivalent() {
        let embedder = Embedder::new("sbert", HashMap::new());
        let out = embedder
            .embed_batch(&["hello".to_string()], None, None)
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert!(!out[0].is_empty());
    }

    #[tokio::test]
    async fn doc_type_map_overrides_default() {
        let mut map = HashMap::new();
        map.insert("legal".to_string(), "sbert".to_string());
        let embedder = Embedder::new("sbert", map);
        let out = embedder
            .embed_batch(&["a".to_string(), "b".to_string()], Some("legal"), None)
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_ne!(out[0], out[1]);
    }
}
