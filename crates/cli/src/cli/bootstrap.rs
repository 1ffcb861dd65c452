//! Wires together the backends every subcommand needs, resolved through
//! the same `ConfigResolver` cascade the server surface uses, so a knob set
//! in the environment behaves identically from the CLI or from `serve`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use idp_core::audit::{AuditStore, NoopAuditStore, SqliteAuditStore};
use idp_core::config::{ConfigResolver, PrefixConfig, ResolveContext};
use idp_core::object_store::{FsObjectStore, ObjectStore};
use idp_llm::{
    BedrockDefaults, BedrockEquivalentBackend, GenerativeRouter, HeuristicRouter, Invoker, OllamaDefaults,
    OllamaEquivalentBackend, PromptEngine, PromptLibrary,
};
use idp_retrieval::{Chunker, Embedder, ElasticsearchEquivalentBackend, MilvusEquivalentBackend, Reranker, VectorStoreProxy};

/// Shared, already-resolved backends. Cheap to clone: everything expensive
/// lives behind an `Arc`.
#[derive(Clone)]
pub struct Context {
    pub resolver: Arc<ConfigResolver>,
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

    pub prompt_engine: Arc<RwLock<PromptEngine>>,
}

impl Context {
    /// Builds the context from the environment. Every value has a local,
    /// no-external-dependency default so the CLI is usable out of the box
    /// against a filesystem-backed object store and an in-process vector
    /// store, and only reaches out to real backends when their endpoints
    /// are configured.
    pub async fn bootstrap() -> anyhow::Result<Self> {
        let resolver = Arc::new(ConfigResolver::default_cascade());
        let ctx = ResolveContext::default();

        let bucket = resolver.get_or("BUCKET", &ctx, "idp-documents");
        let store_root = resolver.get_or("OBJECT_STORE_ROOT", &ctx, "./data/objects");
        let store: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(store_root));

        let audit: Arc<dyn AuditStore> = match resolver.get_opt("AUDIT_DB_PATH", &ctx) {
            Some(path) => Arc::new(SqliteAuditStore::connect(&path)?),
            None => Arc::new(NoopAuditStore),
        };

        let prefixes = Arc::new(PrefixConfig::from_resolver(&resolver, &ctx));

        let default_embed_model = resolver.get_or("EMBED_MODEL", &ctx, "sbert");
        let embedder = Arc::new(Embedder::new(default_embed_model, HashMap::new()));

        let default_chunk_strategy = resolver.get_or("CHUNK_STRATEGY", &ctx, "universal");
        let chunker = Arc::new(Chunker::new(&default_chunk_strategy, HashMap::new()));

        let milvus = Arc::new(MilvusEquivalentBackend::default());
        let elasticsearch = Arc::new(ElasticsearchEquivalentBackend::default());
        let vector_store = Arc::new(VectorStoreProxy::new(milvus, elasticsearch));

        let rerank_provider = resolver.get_opt("RERANK_PROVIDER", &ctx);
        let reranker = rerank_provider.map(|provider| Arc::new(Reranker::from_provider(&provider)));

        let bedrock_endpoints: Vec<String> = resolver
            .get_or("BEDROCK_EQUIVALENT_ENDPOINTS", &ctx, "http://localhost:8081")
            .split(',')
            .map(str::to_string)
            .collect();
        let ollama_endpoints: Vec<String> = resolver
            .get_or("OLLAMA_EQUIVALENT_ENDPOINTS", &ctx, "http://localhost:11434")
            .split(',')
            .map(str::to_string)
            .collect();
        let bedrock_api_key = resolver.get_opt("BEDROCK_EQUIVALENT_API_KEY", &ctx);

        let bedrock = Arc::new(BedrockEquivalentBackend::new(bedrock_endpoints, bedrock_api_key, BedrockDefaults::default()));
        let ollama = Arc::new(OllamaEquivalentBackend::new(ollama_endpoints, OllamaDefaults::default()));
        let invoker = Arc::new(Invoker::new(bedrock, ollama));

        let complexity_threshold: usize = resolver.get_or("PROMPT_COMPLEXITY_THRESHOLD", &ctx, "20").parse().unwrap_or(20);
        let heuristic = Arc::new(HeuristicRouter::with_default_rules(complexity_threshold));
        let generative = Arc::new(GenerativeRouter::new(resolver.get_or("DEFAULT_LLM_BACKEND", &ctx, "bedrock")));

        Ok(Self {
            resolver,
            store,
            audit,
            bucket,
            prefixes,
            embedder,
            chunker,
            vector_store,
            reranker,
            invoker,
            heuristic,
            generative,
            invocation_prefix: "llm-invocations/".to_string(),
            max_prompt_length: 8000,
            classifier_model_id: "bedrock".to_string(),
            weak_model_id: None,
            strong_model_id: None,
            prompt_engine: Arc::new(RwLock::new(PromptEngine::new(PromptLibrary::new()))),
        })
    }

    pub fn resolve_ctx(&self) -> ResolveContext {
        ResolveContext::default()
    }
}
