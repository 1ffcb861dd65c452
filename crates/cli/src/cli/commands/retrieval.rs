//! `chunk`, `embed`, `vector` (collection/insert/search/hybrid-search),
//! `rerank`, `reap-collections`: direct calls into the retrieval crate's
//! building blocks rather than pipeline stages, since these operate on
//! caller-supplied data instead of draining an object-store queue.

use chrono::Utc;
use idp_retrieval::{ChunkRequest, Reaper, SearchFilters, VectorItem};
use serde_json::Value;

use crate::cli::bootstrap::Context;

pub async fn chunk(ctx: &Context, text: &str, strategy: Option<String>, size: usize, overlap: usize) -> anyhow::Result<()> {
    let req = ChunkRequest { chunk_size: size, chunk_overlap: overlap, strategy, ..Default::default() };
    let chunks = ctx.chunker.chunk(text, &req);
    println!("{}", serde_json::to_string_pretty(&chunks)?);
    Ok(())
}

pub async fn embed(ctx: &Context, texts: Vec<String>, doc_type: Option<String>, model: Option<String>) -> anyhow::Result<()> {
    let embeddings = ctx.embedder.embed_batch(&texts, doc_type.as_deref(), model.as_deref()).await?;
    println!("{}", serde_json::to_string_pretty(&embeddings)?);
    Ok(())
}

pub async fn vector_create_collection(ctx: &Context, collection: &str, dim: usize, storage_mode: Option<String>) -> anyhow::Result<()> {
    ctx.vector_store.create_collection(collection, dim, storage_mode.as_deref(), None).await?;
    println!("created {collection}");
    Ok(())
}

pub async fn vector_drop_collection(ctx: &Context, collection: &str, storage_mode: Option<String>) -> anyhow::Result<()> {
    ctx.vector_store.drop_collection(collection, storage_mode.as_deref()).await?;
    println!("dropped {collection}");
    Ok(())
}

pub async fn vector_insert(ctx: &Context, collection: &str, items: Vec<VectorItem>, upsert: bool, storage_mode: Option<String>) -> anyhow::Result<()> {
    let count = ctx.vector_store.insert(collection, items, upsert, storage_mode.as_deref()).await?;
    println!("inserted {count}");
    Ok(())
}

pub async fn vector_search(ctx: &Context, collection: &str, embedding: Vec<f32>, top_k: usize, storage_mode: Option<String>) -> anyhow::Result<()> {
    let results = ctx
        .vector_store
        .search(collection, &embedding, top_k, storage_mode.as_deref(), &SearchFilters::default())
        .await?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

pub async fn vector_hybrid_search(
    ctx: &Context,
    collection: &str,
    embedding: Vec<f32>,
    keywords: Vec<String>,
    top_k: usize,
    storage_mode: Option<String>,
) -> anyhow::Result<()> {
    let results = ctx
        .vector_store
        .hybrid_search(collection, &embedding, &keywords, top_k, storage_mode.as_deref(), &SearchFilters::default())
        .await?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

pub async fn rerank(ctx: &Context, query: &str, matches: Value, top_k: usize) -> anyhow::Result<()> {
    let reranker = ctx.reranker.clone().ok_or_else(|| anyhow::anyhow!("no RERANK_PROVIDER configured"))?;
    let matches: Vec<idp_retrieval::SearchResult> = serde_json::from_value(matches)?;
    let reranked = reranker.rerank(query, matches, top_k).await;
    println!("{}", serde_json::to_string_pretty(&reranked)?);
    Ok(())
}

/// Drops every vector collection registered as ephemeral and past its
/// expiry, grounded on `idp_retrieval::vector_store::ephemeral::Reaper`.
pub async fn reap_collections(ctx: &Context) -> anyhow::Result<()> {
    let reaper = Reaper::new(&ctx.vector_store);
    let reaped = reaper.reap_once(Utc::now()).await?;
    println!("reaped {reaped} collections");
    Ok(())
}
