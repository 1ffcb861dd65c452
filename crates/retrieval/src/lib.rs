//! Chunking, embedding, vector store proxying, reranking, and retrieval
//! orchestration (C14-C19).
//!
//! Document text produced by the extraction stages is split into chunks,
//! embedded, and written into a vector store behind a proxy that can route
//! between backends and reap ephemeral collections. At query time the
//! Retrieval Orchestrator embeds the query, searches the proxy, optionally
//! reranks, and hands the assembled context off to the LLM Router.

pub mod chunker;
pub mod embedder;
pub mod orchestrator;
pub mod reranker;
pub mod vector_store;

pub use chunker::{Chunk, ChunkMetadata, ChunkRequest, ChunkStrategy, Chunker};
pub use embedder::{fallback_embed, EmbedBackend, Embedder};
pub use orchestrator::{RetrievalOrchestrator, RetrievalRequest, RetrievalResult};
pub use reranker::{RerankBackend, Reranker};
pub use vector_store::{
    ElasticsearchEquivalentBackend, EphemeralRegistry, MilvusEquivalentBackend, Reaper, SearchFilters, SearchResult,
    VectorItem, VectorStoreBackend, VectorStoreProxy,
};
