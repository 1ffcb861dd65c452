//! Request handlers for the routes in `routes::create_router`.
//!
//! `ingest` is grounded on `ingest_lambda.py`: that Lambda starts two Step
//! Functions executions in parallel from one event — a file-ingestion
//! workflow (the staged document pipeline, for the raw bytes under `file`)
//! and a knowledge-base ingestion workflow (chunk, embed, insert, for the
//! `text` field) — and requires `collection_name` to start with `kb_`. This
//! handler keeps both branches but runs them synchronously in one request
//! rather than through a workflow engine: a `file` writes straight to the
//! `raw/` prefix for the Classifier stage to pick up later, and a `text`
//! drives the chunk/embed/insert path directly, mirroring
//! `idp_retrieval::RetrievalOrchestrator`'s "both or either" request shape.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use idp_core::error::IdpError;
use idp_llm::{InvokerClassifier, LlmRouter, PredictiveRouter, PromptTemplate, RouteDecision};
use idp_retrieval::{ChunkRequest, RetrievalOrchestrator, RetrievalRequest, RetrievalResult, VectorItem};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub text: Option<String>,
    /// Base64-encoded raw document bytes, written to the `raw/` prefix.
    pub file: Option<String>,
    pub collection_name: String,
    #[serde(rename = "docType")]
    pub doc_type: Option<String>,
    pub department: Option<String>,
    pub team: Option<String>,
    pub user: Option<String>,
    pub file_guid: Option<String>,
    pub file_name: Option<String>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    #[serde(rename = "chunkStrategy")]
    pub chunk_strategy: Option<String>,
    #[serde(rename = "embedModel")]
    pub embed_model: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct IngestResponse {
    pub started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_indexed: Option<usize>,
}

pub async fn ingest(State(state): State<AppState>, Json(req): Json<IngestRequest>) -> ApiResult<Json<IngestResponse>> {
    if !req.collection_name.starts_with("kb_") {
        return Err(ApiError(IdpError::InputInvalid("collection_name must start with kb_".to_string())));
    }
    if req.text.is_none() && req.file.is_none() {
        return Err(ApiError(IdpError::InputInvalid("text or file required".to_string())));
    }

    let mut response = IngestResponse { started: true, ..Default::default() };

    if let Some(file) = &req.file {
        let bytes = BASE64
            .decode(file)
            .map_err(|e| ApiError(IdpError::InputInvalid(format!("file is not valid base64: {e}"))))?;
        let key = format!(
            "{}{}",
            state.prefixes.raw,
            req.file_name.clone().unwrap_or_else(|| req.file_guid.clone().unwrap_or_else(|| uuid::Uuid::new_v4().to_string()))
        );
        state.store.put(&state.bucket, &key, bytes, "application/octet-stream").await?;
        response.raw_key = Some(key);
    }

    if let Some(text) = &req.text {
        let chunk_req = ChunkRequest {
            doc_type: req.doc_type.clone(),
            file_guid: req.file_guid.clone(),
            file_name: req.file_name.clone(),
            department: req.department.clone(),
            team: req.team.clone(),
            user: req.user.clone(),
            chunk_size: req.chunk_size.unwrap_or(1000),
            chunk_overlap: req.chunk_overlap.unwrap_or(200),
            strategy: req.chunk_strategy.clone(),
            extract_entities: false,
        };
        let chunks = state.chunker.chunk(text, &chunk_req);
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = state.embedder.embed_batch(&texts, req.doc_type.as_deref(), req.embed_model.as_deref()).await?;

        if let Some(dim) = embeddings.first().map(|e| e.len()) {
            state.vector_store.create_collection(&req.collection_name, dim, None, None).await.ok();
        }

        let items: Vec<VectorItem> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| VectorItem {
                id: None,
                embedding,
                metadata: serde_json::to_value(&chunk.metadata).unwrap_or(Value::Null),
            })
            .collect();
        let count = items.len();
        state.vector_store.insert(&req.collection_name, items, false, None).await?;
        response.chunks_indexed = Some(count);
    }

    Ok(Json(response))
}

pub async fn query(State(state): State<AppState>, Json(req): Json<RetrievalRequest>) -> Json<RetrievalResult> {
    let orchestrator = RetrievalOrchestrator::new(&state.embedder, &state.vector_store, state.reranker.as_deref());
    Json(orchestrator.retrieve(req).await)
}

pub async fn get_document(State(state): State<AppState>, Path(document_id): Path<String>) -> ApiResult<Json<Value>> {
    let record = state
        .audit
        .get(&document_id)
        .await?
        .ok_or_else(|| IdpError::NotFound(format!("document {document_id} not found")))?;
    Ok(Json(json!({
        "documentId": record.document_id,
        "status": record.status.as_str(),
        "pageCount": record.page_count,
        "info": record.info,
    })))
}

pub async fn route(State(state): State<AppState>, Json(payload): Json<Value>) -> ApiResult<Json<RouteDecision>> {
    let classifier = InvokerClassifier::new(&state.invoker, state.classifier_model_id.clone());
    let predictive = Some(PredictiveRouter::new(&classifier, state.weak_model_id.clone(), state.strong_model_id.clone()));
    let router = LlmRouter::new(
        &state.store,
        state.bucket.clone(),
        state.invocation_prefix.clone(),
        (*state.heuristic).clone(),
        predictive,
        (*state.generative).clone(),
        state.max_prompt_length,
    );

    let decision = router.route(payload).await?;
    Ok(Json(decision))
}

pub async fn invoke(State(state): State<AppState>, Json(payload): Json<Value>) -> ApiResult<Json<Value>> {
    let reply = state.invoker.invoke(&payload).await?;
    Ok(Json(reply))
}

pub async fn register_prompt(State(state): State<AppState>, Json(template): Json<PromptTemplate>) -> ApiResult<Json<Value>> {
    state.prompt_engine.write().await.register(template);
    Ok(Json(json!({"registered": true})))
}

#[derive(Debug, Deserialize)]
pub struct RenderPromptRequest {
    pub prompt_id: String,
    pub version: Option<u32>,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    /// Everything else (`backend`, `strategy`, `system_prompt`, `model`, …)
    /// is forwarded to the Router alongside the rendered prompt.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Renders a stored template (C22) and forwards the result to the Router
/// (C20), mirroring `prompt-engine-lambda`'s resolve-then-route flow.
pub async fn render_prompt(
    State(state): State<AppState>,
    Json(req): Json<RenderPromptRequest>,
) -> ApiResult<Json<RouteDecision>> {
    let rendered = {
        let engine = state.prompt_engine.read().await;
        engine.render(&req.prompt_id, req.version, &req.variables)?
    };

    let mut payload = Value::Object(req.extra);
    payload["prompt"] = Value::String(rendered);

    let classifier = InvokerClassifier::new(&state.invoker, state.classifier_model_id.clone());
    let predictive = Some(PredictiveRouter::new(&classifier, state.weak_model_id.clone(), state.strong_model_id.clone()));
    let router = LlmRouter::new(
        &state.store,
        state.bucket.clone(),
        state.invocation_prefix.clone(),
        (*state.heuristic).clone(),
        predictive,
        (*state.generative).clone(),
        state.max_prompt_length,
    );

    let decision = router.route(payload).await?;
    Ok(Json(decision))
}
