//! OCR Extractor (C9): rasterizes a scan page, dispatches to the configured
//! `OcrManager` backend, layout-reconstructs the recognized text (§4.8's
//! algorithm over hOCR word boxes when available), and writes the page
//! Markdown plus, for `ocrmypdf`, a per-page hOCR JSON.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::{mpsc, Mutex};

use idp_core::config::PrefixConfig;
use idp_core::error::IdpError;
use idp_core::models::{HocrPage, PageText};
use idp_core::object_store::ObjectStore;
use idp_core::work_queue::object_queue::ObjectQueue;
use idp_core::work_queue::{ChunkResult, PipelineError, PipelineEvent, PipelineStage, WorkFilter, WorkQueue};

use crate::ocr::{OcrBackendType, OcrManager};

use super::layout::{reconstruct_markdown, TextBox};

pub struct OcrExtractorStage {
    store: Arc<dyn ObjectStore>,
    queue: ObjectQueue<Arc<dyn ObjectStore>>,
    bucket: String,
    prefixes: PrefixConfig,
    manager: Arc<OcrManager>,
    dpi: u32,
    workers: usize,
    cursor: Mutex<Option<String>>,
}

impl OcrExtractorStage {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        prefixes: PrefixConfig,
        manager: Arc<OcrManager>,
        dpi: u32,
        workers: usize,
    ) -> Self {
        let bucket = bucket.into();
        let queue = ObjectQueue::new(store.clone(), bucket.clone(), prefixes.scan_pages.clone());
        Self {
            store,
            queue,
            bucket,
            prefixes,
            manager,
            dpi,
            workers,
            cursor: Mutex::new(None),
        }
    }
}

struct PageKey {
    document_id: String,
    page_number: u32,
}

fn parse_scan_key(key: &str, scan_prefix: &str) -> Option<PageKey> {
    let rest = key.strip_prefix(scan_prefix)?;
    let (doc, file) = rest.split_once('/')?;
    let number_str = file.strip_prefix("page_")?.strip_suffix(".pdf")?;
    Some(PageKey {
        document_id: doc.to_string(),
        page_number: number_str.parse().ok()?,
    })
}

fn hocr_to_boxes(hocr: &HocrPage) -> Vec<TextBox> {
    hocr.words
        .iter()
        .map(|w| TextBox {
            x0: w.bbox[0],
            y0: w.bbox[1],
            x1: w.bbox[2],
            y1: w.bbox[3],
            text: w.text.clone(),
        })
        .collect()
}

#[async_trait]
impl PipelineStage for OcrExtractorStage {
    fn name(&self) -> &str {
        "OCR Extractor"
    }

    fn is_deferred(&self) -> bool {
        self.manager
            .primary()
            .map(|b| b.is_deferred())
            .unwrap_or(false)
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

            let Some(page_key) = parse_scan_key(&item.key, &self.prefixes.scan_pages) else {
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
            let text_prefix = self.prefixes.text_pages.clone();
            let hocr_prefix = self.prefixes.hocr.clone();
            let manager = self.manager.clone();
            let dpi = self.dpi;
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

                let result = run_ocr_page(&store, &bucket, &key, &manager, dpi);

                match result {
                    Ok((markdown, hocr)) => {
                        let text_dest = format!(
                            "{}{}/page_{:03}.md",
                            text_prefix, page_key.document_id, page_key.page_number
                        );
                        let write = futures::executor::block_on(store.put(
                            &bucket,
                            &text_dest,
                            markdown.into_bytes(),
                            "text/markdown",
                        ));

                        if let Err(e) = write {
                            failed.fetch_add(1, Ordering::Relaxed);
                            let _ = futures::executor::block_on(event_tx.send(PipelineEvent::ItemFailed {
                                stage: stage_name.clone(),
                                item_id,
                                error: e.to_string(),
                            }));
                            return;
                        }

                        if let Some(hocr) = hocr {
                            let hocr_dest = format!(
                                "{}{}/page_{:03}.json",
                                hocr_prefix, page_key.document_id, page_key.page_number
                            );
                            let body = serde_json::to_vec(&hocr).unwrap_or_default();
                            let _ = futures::executor::block_on(store.put(
                                &bucket,
                                &hocr_dest,
                                body,
                                "application/json",
                            ));
                        }

                        succeeded.fetch_add(1, Ordering::Relaxed);
                        let _ = futures::executor::block_on(event_tx.send(PipelineEvent::ItemCompleted {
                            stage: stage_name,
                            item_id,
                            detail: None,
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
                        tracing::error!("OCR extractor worker panicked: {}", e);
                    }
                }
            }
        }

        for h in handles {
            if let Err(e) = h.await {
                tracing::error!("OCR extractor worker panicked: {}", e);
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

fn run_ocr_page(
    store: &Arc<dyn ObjectStore>,
    bucket: &str,
    key: &str,
    manager: &OcrManager,
    dpi: u32,
) -> Result<(String, Option<HocrPage>), IdpError> {
    let pdf_bytes = futures::executor::block_on(store.get(bucket, key))?;
    let temp_dir = TempDir::new().map_err(|e| IdpError::Other(e.into()))?;
    let pdf_path = temp_dir.path().join("page.pdf");
    std::fs::write(&pdf_path, &pdf_bytes).map_err(|e| IdpError::Other(e.into()))?;

    let result = manager.ocr_pdf_page(&pdf_path, 1, dpi)?;

    let page_number = 1u32;
    let markdown = if let Some(hocr) = &result.hocr {
        PageText::render(page_number, &reconstruct_markdown(hocr_to_boxes(hocr)))
    } else {
        PageText::render(page_number, &result.text)
    };

    Ok((markdown, result.hocr))
}

/// Whether OCR is configured to require hOCR output (only `ocrmypdf` emits
/// it); used by the Combine Stage to decide whether to also head-check
/// `hocr/{doc}/page_NNN.json` before combining.
pub fn requires_hocr(primary: OcrBackendType) -> bool {
    matches!(primary, OcrBackendType::OcrMyPdf)
}
