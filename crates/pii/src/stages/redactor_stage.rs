//! Redactor stage (C13): combined doc + hOCR + PII spans -> redacted
//! artifact. Polls `pii/` the way `CombineStage` polls `pdf-pages/` — the
//! presence of the entity file is exactly the "PII detection finished for
//! this document" condition.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use idp_core::audit::AuditStore;
use idp_core::config::{ConfigResolver, PrefixConfig, ResolveContext};
use idp_core::error::IdpError;
use idp_core::models::{DocumentStatus, DocumentText, Hocr};
use idp_core::object_store::ObjectStore;
use idp_core::work_queue::object_queue::ObjectQueue;
use idp_core::work_queue::{
    ChunkResult, PipelineError, PipelineEvent, PipelineStage, WorkFilter, WorkQueue,
};

use crate::redactor::{redact, RedactionInput};
use crate::stages::pii_detector_stage::PiiEntities;

pub struct RedactorStage {
    store: Arc<dyn ObjectStore>,
    audit: Arc<dyn AuditStore>,
    queue: ObjectQueue<Arc<dyn ObjectStore>>,
    bucket: String,
    prefixes: PrefixConfig,
    resolver: Arc<ConfigResolver>,
    cursor: Mutex<Option<String>>,
}

impl RedactorStage {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        audit: Arc<dyn AuditStore>,
        bucket: impl Into<String>,
        prefixes: PrefixConfig,
        resolver: Arc<ConfigResolver>,
    ) -> Self {
        let bucket = bucket.into();
        let queue = ObjectQueue::new(store.clone(), bucket.clone(), prefixes.pii.clone());
        Self {
            store,
            audit,
            queue,
            bucket,
            prefixes,
            resolver,
            cursor: Mutex::new(None),
        }
    }

    fn filter(&self) -> WorkFilter {
        WorkFilter {
            mime_type: Some(".json".to_string()),
            ..Default::default()
        }
    }

    fn document_id_of(&self, key: &str) -> Option<String> {
        let rest = key.strip_prefix(&self.prefixes.pii)?;
        rest.strip_suffix(".json").map(|s| s.to_string())
    }
}

async fn locate_source(
    store: &Arc<dyn ObjectStore>,
    bucket: &str,
    prefixes: &PrefixConfig,
    document_id: &str,
    doc_type: &str,
) -> Result<(Vec<u8>, bool, String), IdpError> {
    if doc_type == "pdf" {
        let pdf_pages_key = format!("{}{}.pdf", prefixes.pdf_raw, document_id);
        if store.exists(bucket, &pdf_pages_key).await? {
            let bytes = store.get(bucket, &pdf_pages_key).await?;
            return Ok((bytes, true, format!("{document_id}.pdf")));
        }
        let raw_key = format!("{}{}.pdf", prefixes.raw, document_id);
        let bytes = store.get(bucket, &raw_key).await?;
        return Ok((bytes, true, format!("{document_id}.pdf")));
    }

    let prefix = format!("{}{}.", prefixes.raw, document_id);
    let page = store.list(bucket, &prefix, None).await?;
    let found = page
        .objects
        .into_iter()
        .next()
        .ok_or_else(|| IdpError::NotFound(format!("no raw source for {document_id}")))?;
    let filename = found.key.rsplit('/').next().unwrap_or(&found.key).to_string();
    let bytes = store.get(bucket, &found.key).await?;
    Ok((bytes, false, filename))
}

async fn redact_document(
    store: &Arc<dyn ObjectStore>,
    bucket: &str,
    prefixes: &PrefixConfig,
    resolver: &ConfigResolver,
    document_id: &str,
) -> Result<String, IdpError> {
    let pii_key = format!("{}{}.json", prefixes.pii, document_id);
    let pii_bytes = store.get(bucket, &pii_key).await?;
    let pii: PiiEntities = serde_json::from_slice(&pii_bytes)
        .map_err(|e| IdpError::ParseError(format!("malformed PII entities: {e}")))?;

    let hocr_key = format!("{}{}.json", prefixes.hocr, document_id);
    let hocr = match store.get(bucket, &hocr_key).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map_err(|e| IdpError::ParseError(format!("malformed hOCR: {e}")))?,
        Err(_) => Hocr {
            document_id: document_id.to_string(),
            pages: Vec::new(),
        },
    };

    let text_docs_key = format!("{}{}.json", prefixes.text_docs, document_id);
    let text_bytes = store.get(bucket, &text_docs_key).await?;
    let doc_text: DocumentText = serde_json::from_slice(&text_bytes)
        .map_err(|e| IdpError::ParseError(format!("malformed document text: {e}")))?;

    let (source_bytes, source_is_pdf, filename) =
        locate_source(store, bucket, prefixes, document_id, &doc_text.doc_type).await?;

    let ctx = ResolveContext::default();
    let dpi: f64 = resolver
        .get_or("OCR_DPI", &ctx, "200")
        .parse()
        .unwrap_or(200.0);

    let redacted_bytes = redact(RedactionInput {
        source_bytes: &source_bytes,
        source_is_pdf,
        hocr: &hocr,
        entities: &pii.entities,
        dpi,
    })?;

    let dest = format!("{}{}", prefixes.redacted, filename);
    let content_type = if source_is_pdf { "application/pdf" } else { "image/png" };
    store.put(bucket, &dest, redacted_bytes, content_type).await?;
    Ok(dest)
}

#[async_trait]
impl PipelineStage for RedactorStage {
    fn name(&self) -> &str {
        "Redactor"
    }

    fn is_deferred(&self) -> bool {
        false
    }

    async fn count(&self) -> Result<u64, PipelineError> {
        Ok(self.queue.count(&self.filter()).await?)
    }

    async fn run_chunk(
        &self,
        chunk_size: usize,
        remaining_limit: usize,
        event_tx: &mpsc::Sender<PipelineEvent>,
    ) -> Result<ChunkResult, PipelineError> {
        let batch_limit = if remaining_limit > 0 {
            chunk_size.min(remaining_limit)
        } else {
            chunk_size
        };

        let filter = self.filter();
        let cursor = self.cursor.lock().await.clone();
        let items = self
            .queue
            .fetch_batch(&filter, batch_limit, cursor.as_deref())
            .await?;

        if items.is_empty() {
            return Ok(ChunkResult::default());
        }
        if let Some(last) = items.last() {
            *self.cursor.lock().await = Some(last.key.clone());
        }
        let has_more = items.len() >= batch_limit;

        let succeeded = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        let stage_name = self.name().to_string();

        for item in &items {
            let work_handle = self.queue.claim(item, &filter).await?;
            self.queue.complete(work_handle).await?;

            let Some(document_id) = self.document_id_of(&item.key) else {
                continue;
            };

            let _ = event_tx
                .send(PipelineEvent::ItemStarted {
                    stage: stage_name.clone(),
                    item_id: document_id.clone(),
                    label: item.key.clone(),
                })
                .await;

            let _ = self
                .audit
                .update(&document_id, DocumentStatus::RedactionStarted, None, None)
                .await;

            let result = redact_document(
                &self.store,
                &self.bucket,
                &self.prefixes,
                &self.resolver,
                &document_id,
            )
            .await;

            match result {
                Ok(dest) => {
                    succeeded.fetch_add(1, Ordering::Relaxed);
                    let _ = event_tx
                        .send(PipelineEvent::ItemCompleted {
                            stage: stage_name.clone(),
                            item_id: document_id.clone(),
                            detail: Some(dest),
                        })
                        .await;
                }
                Err(e) => {
                    let _ = self
                        .audit
                        .update(
                            &document_id,
                            DocumentStatus::RedactionError,
                            None,
                            Some(&e.to_string()),
                        )
                        .await;
                    failed.fetch_add(1, Ordering::Relaxed);
                    let _ = event_tx
                        .send(PipelineEvent::ItemFailed {
                            stage: stage_name.clone(),
                            item_id: document_id.clone(),
                            error: e.to_string(),
                        })
                        .await;
                }
            }
        }

        Ok(ChunkResult {
            succeeded: succeeded.load(Ordering::Relaxed),
            failed: failed.load(Ordering::Relaxed),
            skipped: 0,
            has_more,
        })
    }
}
