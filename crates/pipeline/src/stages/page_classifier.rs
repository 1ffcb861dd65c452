//! Page Classifier (C7): per split page, routes to `scan-pages/` (needs
//! OCR) or directly extracts embedded text to `text-pages/{doc}/page_NNN.md`
//! (§4.8's algorithm, shared with the Text Extractor via `pdf_text`/`layout`).
//!
//! The glossary defines `text-pages/` as Markdown-only, so unlike
//! `scan-pages/` (which just forwards the page bytes for the OCR Extractor
//! to rasterize), this stage performs the extraction itself rather than
//! forwarding a PDF page for a separate stage to read — the same kind of
//! stage-merge the corpus's own `TextExtractionStage` makes for its inline
//! MIME check. Recorded as a deliberate deviation in DESIGN.md.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lopdf::Document as PdfDocument;
use tokio::sync::{mpsc, Mutex};

use idp_core::config::PrefixConfig;
use idp_core::error::IdpError;
use idp_core::models::PageText;
use idp_core::object_store::ObjectStore;
use idp_core::work_queue::object_queue::ObjectQueue;
use idp_core::work_queue::{ChunkResult, PipelineError, PipelineEvent, PipelineStage, WorkFilter, WorkQueue};

use super::layout::reconstruct_markdown;
use super::pdf_text::{extract_page_boxes, ordered_pages};

pub struct PageClassifierStage {
    store: Arc<dyn ObjectStore>,
    queue: ObjectQueue<Arc<dyn ObjectStore>>,
    bucket: String,
    prefixes: PrefixConfig,
    workers: usize,
    force_ocr: bool,
    cursor: Mutex<Option<String>>,
}

impl PageClassifierStage {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        prefixes: PrefixConfig,
        workers: usize,
        force_ocr: bool,
    ) -> Self {
        let bucket = bucket.into();
        let queue = ObjectQueue::new(store.clone(), bucket.clone(), prefixes.pdf_pages.clone());
        Self {
            store,
            queue,
            bucket,
            prefixes,
            workers,
            force_ocr,
            cursor: Mutex::new(None),
        }
    }
}

/// Everything this stage needs from a `pdf-pages/{doc}/page_NNN.pdf` key.
struct PageKey {
    document_id: String,
    page_number: u32,
}

fn parse_page_key(key: &str, pages_prefix: &str) -> Option<PageKey> {
    let rest = key.strip_prefix(pages_prefix)?;
    if rest.ends_with("manifest.json") {
        return None;
    }
    let (doc, file) = rest.split_once('/')?;
    let number_str = file.strip_prefix("page_")?.strip_suffix(".pdf")?;
    let page_number: u32 = number_str.parse().ok()?;
    Some(PageKey {
        document_id: doc.to_string(),
        page_number,
    })
}

#[async_trait]
impl PipelineStage for PageClassifierStage {
    fn name(&self) -> &str {
        "Page Classifier"
    }

    fn is_deferred(&self) -> bool {
        false
    }

    async fn count(&self) -> Result<u64, PipelineError> {
        Ok(self.queue.count(&WorkFilter::default()).await?)
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

        let filter = WorkFilter::default();
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
        let mut handles = Vec::with_capacity(items.len().min(self.workers));

        for item in &items {
            let work_handle = self.queue.claim(item, &filter).await?;
            self.queue.complete(work_handle).await?;

            let Some(page_key) = parse_page_key(&item.key, &self.prefixes.pdf_pages) else {
                skipped.fetch_add(1, Ordering::Relaxed);
                let _ = event_tx
                    .send(PipelineEvent::ItemSkipped {
                        stage: stage_name.clone(),
                        item_id: item.key.clone(),
                    })
                    .await;
                continue;
            };

            let store = self.store.clone();
            let bucket = self.bucket.clone();
            let key = item.key.clone();
            let scan_prefix = self.prefixes.scan_pages.clone();
            let text_prefix = self.prefixes.text_pages.clone();
            let force_ocr = self.force_ocr;
            let succeeded = succeeded.clone();
            let failed = failed.clone();
            let event_tx = event_tx.clone();
            let stage_name = stage_name.clone();
            let item_id = format!("{}:p{:03}", page_key.document_id, page_key.page_number);

            let handle = tokio::task::spawn_blocking(move || {
                let _ = futures::executor::block_on(event_tx.send(PipelineEvent::ItemStarted {
                    stage: stage_name.clone(),
                    item_id: item_id.clone(),
                    label: key.clone(),
                }));

                let bytes = match futures::executor::block_on(store.get(&bucket, &key)) {
                    Ok(b) => b,
                    Err(e) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                        let _ = futures::executor::block_on(event_tx.send(PipelineEvent::ItemFailed {
                            stage: stage_name.clone(),
                            item_id,
                            error: e.to_string(),
                        }));
                        return;
                    }
                };

                let has_text = !force_ocr && page_has_any_text(&bytes);

                let result = if has_text {
                    extract_and_write_page(&bytes, &page_key, &text_prefix, &store, &bucket)
                } else {
                    let dest = format!(
                        "{}{}/page_{:03}.pdf",
                        scan_prefix, page_key.document_id, page_key.page_number
                    );
                    futures::executor::block_on(store.put(&bucket, &dest, bytes, "application/pdf"))
                        .map_err(IdpError::from)
                };

                match result {
                    Ok(()) => {
                        succeeded.fetch_add(1, Ordering::Relaxed);
                        let _ = futures::executor::block_on(event_tx.send(PipelineEvent::ItemCompleted {
                            stage: stage_name,
                            item_id,
                            detail: Some(if has_text { "text".into() } else { "scan".into() }),
                        }));
                    }
                    Err(e) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                        let _ = futures::executor::block_on(event_tx.send(PipelineEvent::ItemFailed {
                            stage: stage_name,
                            item_id,
                            error: e.to_string(),
                        }));
                    }
                }
            });

            handles.push(handle);
            if handles.len() >= self.workers {
                for h in handles.drain(..) {
                    if let Err(e) = h.await {
                        tracing::error!("Page classifier worker panicked: {}", e);
                    }
                }
            }
        }

        for h in handles {
            if let Err(e) = h.await {
                tracing::error!("Page classifier worker panicked: {}", e);
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

fn page_has_any_text(pdf_bytes: &[u8]) -> bool {
    let Ok(doc) = PdfDocument::load_mem(pdf_bytes) else {
        return false;
    };
    ordered_pages(&doc)
        .first()
        .map(|(_, page_id)| !extract_page_boxes(&doc, *page_id).is_empty())
        .unwrap_or(false)
}

fn extract_and_write_page(
    pdf_bytes: &[u8],
    page_key: &PageKey,
    text_prefix: &str,
    store: &Arc<dyn ObjectStore>,
    bucket: &str,
) -> Result<(), IdpError> {
    let doc = PdfDocument::load_mem(pdf_bytes)
        .map_err(|e| IdpError::ParseError(format!("malformed PDF page: {e}")))?;
    let (_, page_id) = ordered_pages(&doc)
        .into_iter()
        .next()
        .ok_or_else(|| IdpError::ParseError("single-page PDF has no pages".into()))?;
    let boxes = extract_page_boxes(&doc, page_id);
    let markdown = PageText::render(page_key.page_number, &reconstruct_markdown(boxes));
    let dest = format!(
        "{}{}/page_{:03}.md",
        text_prefix, page_key.document_id, page_key.page_number
    );
    futures::executor::block_on(store.put(bucket, &dest, markdown.into_bytes(), "text/markdown"))
        .map_err(IdpError::from)
}
