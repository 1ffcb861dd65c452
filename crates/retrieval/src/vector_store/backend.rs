use async_trait::async_trait;

use idp_core::error::IdpError;

use super::types::{SearchResult, VectorItem};

/// Backend-agnostic CRUD + search, implemented once per concrete vector
/// database (or search engine) the Vector Store Proxy can route to.
#[async_trait]
pub trait VectorStoreBackend: Send + Sync {
    async fn insert(&self, collection: &str, items: Vec<VectorItem>, upsert: bool) -> Result<usize, IdpError>;
    async fn update(&self, collection: &str, items: Vec<VectorItem>) -> Result<usize, IdpError>;
    async fn delete(&self, collection: &str, ids: &[i64]) -> Result<usize, IdpError>;
    async fn create_collection(&self, collection: &str, dim: usize) -> Result<(), IdpError>;
    async fn drop_collection(&self, collection: &str) -> Result<(), IdpError>;
    async fn search(&self, collection: &str, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>, IdpError>;
    async fn hybrid_search(
        &self,
        collection: &str,
        embedding: &[f32],
        keywords: &[String],
        top_k: usize,
    ) -> Result<Vec<SearchResult>, IdpError>;
}
