//! Text Extractor (C8): whole-document embedded-text extraction for
//! text-bearing PDFs routed to `office-docs/` by the Classifier. Applies
//! §4.8's layout-reconstruction algorithm to every page and writes
//! `text-docs/{doc}.json` directly — no split/combine needed, the same
//! shape as the Office Extractor's DOCX/PPTX/XLSX path.
//!
//! Per-split-page text extraction (when a page survives the Splitter and
//! the Page Classifier finds it has embedded text) is handled inline by
//! `PageClassifierStage`, which shares this module's `pdf_text`/`layout`
//! helpers; see its doc comment for why that merge was necessary.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lopdf::Document as PdfDocument;
use tokio::sync::{mpsc, Mutex};

use idp_core::audit::AuditStore;
use idp_core::config::PrefixConfig;
use idp_core::error::IdpError;
use idp_core::models::{DocumentStatus, DocumentText, PageText};
use idp_core::object_store::ObjectStore;
use idp_core::work_queue::object_queue::ObjectQueue;
use idp_core::work_queue::{ChunkResult, PipelineError, PipelineEvent, PipelineStage, WorkFilter, WorkQueue};

use super::ids::document_id_from_key;
use super::layout::reconstruct_markdown;
use super::pdf_text::{extract_page_boxes, ordered_pages};

pub struct TextExtractorStage {
    store: Arc<dyn ObjectStore>,
    audit: Arc<dyn AuditStore>,
    queue: ObjectQueue<Arc<dyn ObjectStore>>,
    bucket: String,
    prefixes: PrefixConfig,
    workers: usize,
    cursor: Mutex<Option<String>>,
}

impl TextExtractorStage {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        audit: Arc<dyn AuditStore>,
        bucket: impl Into<String>,
        prefixes: PrefixConfig,
        workers: usize,
    ) -> Self {
        let bucket = bucket.into();
        let queue = ObjectQueue::new(store.clone(), bucket.clone(), prefixes.office_docs.clone());
        Self {
            store,
            audit,
            queue,
            bucket,
            prefixes,
            workers,
            cursor: Mutex::new(None),
        }
    }
}

fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, IdpError> {
    let doc = PdfDocument::load_mem(bytes)
        .map_err(|e| IdpError::ParseError(format!("malformed PDF: {e}")))?;
    let pages = ordered_pages(&doc);
    Ok(pages
        .into_iter()
        .map(|(page_number, page_id)| {
            let boxes = extract_page_boxes(&doc, page_id);
            PageText::render(page_number, &reconstruct_markdown(boxes))
        })
        .collect())
}

#[async_trait]
impl PipelineStage for TextExtractorStage {
    fn name(&self) -> &str {
        "Text Extractor"
    }

    fn is_deferred(&self) -> bool {
        false
    }

    async fn count(&self) -> Result<u64, PipelineError> {
        let filter = WorkFilter {
            mime_type: Some(".pdf".to_string()),
            ..Default::default()
        };
        Ok(self.queue.count(&filter).await?)
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

        let filter = WorkFilter {
            mime_type: Some(".pdf".to_string()),
            ..Default::default()
        };
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
        let mut handles = Vec::with_capacity(items.len().min(self.workers));

        for item in &items {
            let work_handle = self.queue.claim(item, &filter).await?;
            self.queue.complete(work_handle).await?;

            let document_id = document_id_from_key(&item.key);
            let store = self.store.clone();
            let audit = self.audit.clone();
            let bucket = self.bucket.clone();
            let key = item.key.clone();
            let text_docs_prefix = self.prefixes.text_docs.clone();
            let succeeded = succeeded.clone();
            let failed = failed.clone();
            let event_tx = event_tx.clone();
            let stage_name = stage_name.clone();

            let handle = tokio::task::spawn_blocking(move || {
                let _ = futures::executor::block_on(event_tx.send(PipelineEvent::ItemStarted {
                    stage: stage_name.clone(),
                    item_id: document_id.clone(),
                    label: key.clone(),
                }));

                let result = futures::executor::block_on(store.get(&bucket, &key))
                    .map_err(IdpError::from)
                    .and_then(|bytes| extract_pdf_pages(&bytes));

                match result {
                    Ok(pages) => {
                        let page_count = pages.len() as u32;
                        let doc_text = DocumentText {
                            document_id: document_id.clone(),
                            doc_type: "pdf".to_string(),
                            page_count,
                            pages,
                        };
                        let dest = format!("{}{}.json", text_docs_prefix, document_id);
                        let body = serde_json::to_vec(&doc_text).unwrap_or_default();
                        match futures::executor::block_on(store.put(
                            &bucket,
                            &dest,
                            body,
                            "application/json",
                        )) {
                            Ok(()) => {
                                futures::executor::block_on(audit.update(
                                    &document_id,
                                    DocumentStatus::Combined,
                                    Some(page_count),
                                    Some("COMBINED"),
                                ))
                                .ok();
                                succeeded.fetch_add(1, Ordering::Relaxed);
                                let _ = futures::executor::block_on(event_tx.send(
                                    PipelineEvent::ItemCompleted {
                                        stage: stage_name.clone(),
                                        item_id: document_id.clone(),
                                        detail: None,
                                    },
                                ));
                            }
                            Err(e) => {
                                failed.fetch_add(1, Ordering::Relaxed);
                                let _ = futures::executor::block_on(event_tx.send(
                                    PipelineEvent::ItemFailed {
                                        stage: stage_name.clone(),
                                        item_id: document_id.clone(),
                                        error: e.to_string(),
                                    },
                                ));
                            }
                        }
                    }
                    Err(e) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                        let _ = futures::executor::block_on(event_tx.send(PipelineEvent::ItemFailed {
                            stage: stage_name.clone(),
                            item_id: document_id.clone(),
                            error: e.to_string(),
                        }));
                    }
                }
            });

            handles.push(handle);
            if handles.len() >= self.workers {
                for h in handles.drain(..) {
                    if let Err(e) = h.await {
                        tracing::error!("Text extractor worker panicked: {}", e);
                    }
                }
            }
        }

        for h in handles {
            if let Err(e) = h.await {
                tracing::error!("Text extractor worker panicked: {}", e);
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
