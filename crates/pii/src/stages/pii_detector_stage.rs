//! PII Detector stage (C12): runs the regex∪NER union over each combined
//! document and writes `pii/{doc}.json`. Polls `text-docs/` the same way
//! every other stage in the corpus polls its input prefix.
//!
//! For a document with hOCR (it went through OCR), detection runs over the
//! hOCR-reconstructed plain text rather than the rendered markdown in
//! `text-docs/`, so the entity offsets it produces line up with the
//! Redactor's hOCR offset index. A born-digital document with no hOCR has
//! no box mapping to align with anyway, so its entities are detected
//! straight from the rendered text.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};

use idp_core::audit::AuditStore;
use idp_core::config::{ConfigResolver, PrefixConfig, ResolveContext};
use idp_core::error::IdpError;
use idp_core::models::{Domain, DocumentStatus, DocumentText, Entity, Hocr};
use idp_core::object_store::ObjectStore;
use idp_core::work_queue::object_queue::ObjectQueue;
use idp_core::work_queue::{
    ChunkResult, PipelineError, PipelineEvent, PipelineStage, WorkFilter, WorkQueue,
};

use crate::detector::PiiDetector;
use crate::redactor::hocr_plain_text;

#[derive(Debug, Serialize, Deserialize)]
pub struct PiiEntities {
    pub document_id: String,
    pub entities: Vec<Entity>,
}

pub struct PiiDetectorStage {
    store: Arc<dyn ObjectStore>,
    audit: Arc<dyn AuditStore>,
    queue: ObjectQueue<Arc<dyn ObjectStore>>,
    bucket: String,
    prefixes: PrefixConfig,
    resolver: Arc<ConfigResolver>,
    detector: Arc<PiiDetector>,
    cursor: Mutex<Option<String>>,
}

impl PiiDetectorStage {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        audit: Arc<dyn AuditStore>,
        bucket: impl Into<String>,
        prefixes: PrefixConfig,
        resolver: Arc<ConfigResolver>,
        detector: Arc<PiiDetector>,
    ) -> Self {
        let bucket = bucket.into();
        let queue = ObjectQueue::new(store.clone(), bucket.clone(), prefixes.text_docs.clone());
        Self {
            store,
            audit,
            queue,
            bucket,
            prefixes,
            resolver,
            detector,
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
        let rest = key.strip_prefix(&self.prefixes.text_docs)?;
        rest.strip_suffix(".json").map(|s| s.to_string())
    }
}

async fn resolve_domain(
    store: &Arc<dyn ObjectStore>,
    resolver: &ConfigResolver,
    bucket: &str,
    key: &str,
) -> Domain {
    let mut ctx = ResolveContext::default();
    ctx.tags = store.get_tags(bucket, key).await.unwrap_or_default();
    Domain::from_label(&resolver.get_or("DOMAIN", &ctx, ""))
}

async fn detect_document(
    store: &Arc<dyn ObjectStore>,
    bucket: &str,
    prefixes: &PrefixConfig,
    resolver: &ConfigResolver,
    detector: &PiiDetector,
    document_id: &str,
    key: &str,
) -> Result<usize, IdpError> {
    let domain = resolve_domain(store, resolver, bucket, key).await;

    let hocr_key = format!("{}{}.json", prefixes.hocr, document_id);
    let text = match store.get(bucket, &hocr_key).await {
        Ok(bytes) => {
            let hocr: Hocr = serde_json::from_slice(&bytes)
                .map_err(|e| IdpError::ParseError(format!("malformed hOCR: {e}")))?;
            hocr_plain_text(&hocr)
        }
        Err(_) => {
            let bytes = store.get(bucket, key).await?;
            let doc_text: DocumentText = serde_json::from_slice(&bytes)
                .map_err(|e| IdpError::ParseError(format!("malformed document text: {e}")))?;
            doc_text.pages.join("\n")
        }
    };

    let entities = detector.detect(&text, domain);
    let count = entities.len();
    let payload = PiiEntities {
        document_id: document_id.to_string(),
        entities,
    };
    let dest = format!("{}{}.json", prefixes.pii, document_id);
    let body = serde_json::to_vec(&payload)
        .map_err(|e| IdpError::PiiDetectionFailed(e.to_string()))?;
    store.put(bucket, &dest, body, "application/json").await?;
    Ok(count)
}

#[async_trait]
impl PipelineStage for PiiDetectorStage {
    fn name(&self) -> &str {
        "PII Detector"
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

            let result = detect_document(
                &self.store,
                &self.bucket,
                &self.prefixes,
                &self.resolver,
                &self.detector,
                &document_id,
                &item.key,
            )
            .await;

            match result {
                Ok(count) => {
                    let _ = self
                        .audit
                        .update(
                            &document_id,
                            DocumentStatus::PiiDetected,
                            None,
                            Some(&format!("{count} entities")),
                        )
                        .await;
                    succeeded.fetch_add(1, Ordering::Relaxed);
                    let _ = event_tx
                        .send(PipelineEvent::ItemCompleted {
                            stage: stage_name.clone(),
                            item_id: document_id.clone(),
                            detail: Some(format!("{count} entities")),
                        })
                        .await;
                }
                Err(e) => {
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
