//! Classifier Stage (C5): routes a raw upload to `office-docs/` (Office
//! files and text-bearing PDFs) or `pdf-raw/` (scan-only PDFs), following
//! the corpus's claim/process/complete `PipelineStage` shape.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lopdf::Document as PdfDocument;
use tokio::sync::{mpsc, Mutex};

use idp_core::audit::AuditStore;
use idp_core::config::PrefixConfig;
use idp_core::models::{DocumentStatus, DocumentType};
use idp_core::object_store::ObjectStore;
use idp_core::work_queue::object_queue::ObjectQueue;
use idp_core::work_queue::{ChunkResult, PipelineError, PipelineEvent, PipelineStage, WorkFilter, WorkQueue};

use super::ids::{document_id_from_key, extension_of};
use super::pdf_text::{ordered_pages, page_has_text};

pub struct ClassifierStage {
    store: Arc<dyn ObjectStore>,
    audit: Arc<dyn AuditStore>,
    queue: ObjectQueue<Arc<dyn ObjectStore>>,
    bucket: String,
    prefixes: PrefixConfig,
    cursor: Mutex<Option<String>>,
}

impl ClassifierStage {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        audit: Arc<dyn AuditStore>,
        bucket: impl Into<String>,
        prefixes: PrefixConfig,
    ) -> Self {
        let bucket = bucket.into();
        let queue = ObjectQueue::new(store.clone(), bucket.clone(), prefixes.raw.clone());
        Self {
            store,
            audit,
            queue,
            bucket,
            prefixes,
            cursor: Mutex::new(None),
        }
    }

    fn filter(&self) -> WorkFilter {
        WorkFilter::default()
    }
}

/// `DocumentType::Docx/Pptx/Xlsx` always route to `office-docs/`; a PDF
/// routes there only when its first page carries embedded text, otherwise
/// it's scan-only and goes to `pdf-raw/` for the split+OCR path.
fn classify_bytes(doc_type: DocumentType, bytes: &[u8]) -> Option<&'static str> {
    match doc_type {
        DocumentType::Docx | DocumentType::Pptx | DocumentType::Xlsx => Some("office-docs"),
        DocumentType::Pdf => {
            let pdf = PdfDocument::load_mem(bytes).ok()?;
            let pages = ordered_pages(&pdf);
            let first_has_text = pages
                .first()
                .map(|(_, page_id)| page_has_text(&pdf, *page_id))
                .unwrap_or(false);
            Some(if first_has_text { "office-docs" } else { "pdf-raw" })
        }
        DocumentType::Image => None,
    }
}

#[async_trait]
impl PipelineStage for ClassifierStage {
    fn name(&self) -> &str {
        "Classifier"
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
        let skipped = Arc::new(AtomicUsize::new(0));
        let stage_name = self.name().to_string();

        for item in &items {
            let work_handle = self.queue.claim(item, &filter).await?;
            self.queue.complete(work_handle).await?;

            let Some(ext) = extension_of(&item.key) else {
                skipped.fetch_add(1, Ordering::Relaxed);
                let _ = event_tx
                    .send(PipelineEvent::ItemSkipped {
                        stage: stage_name.clone(),
                        item_id: item.key.clone(),
                    })
                    .await;
                continue;
            };
            let Some(doc_type) = DocumentType::from_extension(&ext) else {
                tracing::info!("skipping {}: unsupported extension {}", item.key, ext);
                skipped.fetch_add(1, Ordering::Relaxed);
                let _ = event_tx
                    .send(PipelineEvent::ItemSkipped {
                        stage: stage_name.clone(),
                        item_id: item.key.clone(),
                    })
                    .await;
                continue;
            };

            let _ = event_tx
                .send(PipelineEvent::ItemStarted {
                    stage: stage_name.clone(),
                    item_id: item.key.clone(),
                    label: item.key.clone(),
                })
                .await;

            let document_id = document_id_from_key(&item.key);
            let bytes = match self.store.get(&self.bucket, &item.key).await {
                Ok(b) => b,
                Err(e) => {
                    failed.fetch_add(1, Ordering::Relaxed);
                    let _ = event_tx
                        .send(PipelineEvent::ItemFailed {
                            stage: stage_name.clone(),
                            item_id: item.key.clone(),
                            error: e.to_string(),
                        })
                        .await;
                    continue;
                }
            };

            let route = match doc_type {
                DocumentType::Image => None,
                _ => classify_bytes(doc_type, &bytes),
            };

            let Some(route) = route else {
                skipped.fetch_add(1, Ordering::Relaxed);
                let _ = event_tx
                    .send(PipelineEvent::ItemSkipped {
                        stage: stage_name.clone(),
                        item_id: item.key.clone(),
                    })
                    .await;
                continue;
            };

            let dest_prefix = if route == "office-docs" {
                &self.prefixes.office_docs
            } else {
                &self.prefixes.pdf_raw
            };
            let dest_key = format!("{}{}.{}", dest_prefix, document_id, ext);
            let content_type = match doc_type {
                DocumentType::Pdf => "application/pdf",
                _ => "application/octet-stream",
            };

            let write_result = self.store.put(&self.bucket, &dest_key, bytes, content_type).await;
            match write_result {
                Ok(()) => {
                    let _ = self
                        .audit
                        .create_if_absent(&document_id, DocumentStatus::Uploaded)
                        .await;
                    let _ = self
                        .audit
                        .update(&document_id, DocumentStatus::Uploaded, None, Some(route))
                        .await;
                    succeeded.fetch_add(1, Ordering::Relaxed);
                    let _ = event_tx
                        .send(PipelineEvent::ItemCompleted {
                            stage: stage_name.clone(),
                            item_id: item.key.clone(),
                            detail: Some(format!("routed to {}", dest_key)),
                        })
                        .await;
                }
                Err(e) => {
                    failed.fetch_add(1, Ordering::Relaxed);
                    let _ = event_tx
                        .send(PipelineEvent::ItemFailed {
                            stage: stage_name.clone(),
                            item_id: item.key.clone(),
                            error: e.to_string(),
                        })
                        .await;
                }
            }
        }

        Ok(ChunkResult {
            succeeded: succeeded.load(Ordering::Relaxed),
            failed: failed.load(Ordering::Relaxed),
            skipped: skipped.load(Ordering::Relaxed),
            has_more,
        })
    }
}
