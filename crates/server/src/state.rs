//! Shared application state for the HTTP server, grounded on the teacher's
//! `src/server/mod.rs` `AppState`/`serve()` pair: a `Clone`-able bundle of
//! already-constructed backends, built once at startup and handed to every
//! request handler through axum's `State` extractor.
//!
//! `LlmRouter` and `PredictiveRouter` borrow their `ObjectStore`/classifier
//! for the duration of a single call (same shape as
//! `idp_retrieval::RetrievalOrchestrator`), so `AppState` holds their
//! ingredients rather than a built router, and each `/route` request
//! assembles one fresh from `state.store`/`state.invoker`.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::RwLock;

use idp_core::audit::AuditStore;
use idp_core::config::PrefixConfig;
use idp_core::object_store::ObjectStore;
use idp_llm::{GenerativeRouter, HeuristicRouter, Invoker, PromptEngine};
use idp_retrieval::{Chunker, Embedder, Reranker, VectorStoreProxy};

use crate::routes::create_router;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub audit: Arc<dyn AuditStore>,
    pub bucket: String,
    pub prefixes: Arc<PrefixConfig>,

    pub embedder: Arc<Embedder>,
    pub chunker: Arc<Chunker>,
    pub vector_store: Arc<VectorStoreProxy>,
    pub reranker: Option<Arc<Reranker>>,

    pub invoker: Arc<Invoker>,
    pub heuristic: Arc<HeuristicRouter>,
    pub generative: Arc<GenerativeRouter>,
    pub invocation_prefix: String,
    pub max_prompt_length: usize,
    pub classifier_model_id: String,
    pub weak_model_id: Option<String>,
    pub strong_model_id: Option<String>,

    /// Guarded by a lock since `register` takes `&mut self`; templates are
    /// registered rarely and rendered often.
    pub prompt_engine: Arc<RwLock<PromptEngine>>,
}

/// Starts the HTTP server on `host:port`, serving until the process is killed.
pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    tracing::info!("starting server at http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
