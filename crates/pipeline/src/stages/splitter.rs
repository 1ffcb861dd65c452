//! PDF Splitter (C6): splits a scan-only PDF under `pdf-raw/` into one
//! single-page PDF per page under `pdf-pages/{docId}/`, writing the
//! manifest last so its existence implies every page object exists.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lopdf::Document as PdfDocument;
use tokio::sync::{mpsc, Mutex};

use idp_core::audit::AuditStore;
use idp_core::config::PrefixConfig;
use idp_core::error::IdpError;
use idp_core::models::{DocumentStatus, Manifest};
use idp_core::object_store::ObjectStore;
use idp_core::work_queue::object_queue::ObjectQueue;
use idp_core::work_queue::{ChunkResult, PipelineError, PipelineEvent, PipelineStage, WorkFilter, WorkQueue};

use super::ids::document_id_from_key;
use super::pdf_text::ordered_pages;

/// Pages beyond this are rejected at split time with `InputInvalid` (§4.6).
const MAX_PAGES: usize = 999;

pub struct SplitterStage {
    store: Arc<dyn ObjectStore>,
    audit: Arc<dyn AuditStore>,
    queue: ObjectQueue<Arc<dyn ObjectStore>>,
    bucket: String,
    prefixes: PrefixConfig,
    workers: usize,
    cursor: Mutex<Option<String>>,
}

impl SplitterStage {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        audit: Arc<dyn AuditStore>,
        bucket: impl Into<String>,
        prefixes: PrefixConfig,
        workers: usize,
    ) -> Self {
        let bucket = bucket.into();
        let queue = ObjectQueue::new(store.clone(), bucket.clone(), prefixes.pdf_raw.clone());
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

/// Splits `bytes` into one single-page PDF per page, returning them in page
/// order (1-based). Fails with `InputInvalid` past `MAX_PAGES`.
fn split_pdf(bytes: &[u8]) -> Result<Vec<Vec<u8>>, IdpError> {
    let doc = PdfDocument::load_mem(bytes)
        .map_err(|e| IdpError::ParseError(format!("malformed PDF: {e}")))?;
    let pages = ordered_pages(&doc);
    if pages.len() > MAX_PAGES {
        return Err(IdpError::InputInvalid(format!(
            "document has {} pages, exceeding the {} page limit",
            pages.len(),
            MAX_PAGES
        )));
    }

    let mut out = Vec::with_capacity(pages.len());
    for (page_number, _) in &pages {
        let mut single = doc.clone();
        let others: Vec<u32> = pages
            .iter()
            .map(|(n, _)| *n)
            .filter(|n| n != page_number)
            .collect();
        single.delete_pages(&others);
        let mut buf = Vec::new();
        single
            .save_to(&mut buf)
            .map_err(|e| IdpError::Other(anyhow::anyhow!("failed to save page PDF: {e}")))?;
        out.push(buf);
    }
    Ok(out)
}

#[async_trait]
impl PipelineStage for SplitterStage {
    fn name(&self) -> &str {
        "PDF Splitter"
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

            let document_id = document_id_from_key(&item.key);
            let store = self.store.clone();
            let audit = self.audit.clone();
            let bucket = self.bucket.clone();
            let pdf_pages_prefix = self.prefixes.pdf_pages.clone();
            let key = item.key.clone();
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

                let bytes = futures::executor::block_on(store.get(&bucket, &key));
                let result = bytes.map_err(IdpError::from).and_then(|b| split_pdf(&b));

                match result {
                    Ok(pages) => {
                        let page_count = pages.len() as u32;
                        let mut write_err = None;
                        for (i, page_bytes) in pages.into_iter().enumerate() {
                            let page_key = format!(
                                "{}{}/page_{:03}.pdf",
                                pdf_pages_prefix,
                                document_id,
                                i + 1
                            );
                            if let Err(e) = futures::executor::block_on(store.put(
                                &bucket,
                                &page_key,
                                page_bytes,
                                "application/pdf",
                            )) {
                                write_err = Some(e);
                                break;
                            }
                        }

                        if let Some(e) = write_err {
                            failed.fetch_add(1, Ordering::Relaxed);
                            let _ = futures::executor::block_on(event_tx.send(
                                PipelineEvent::ItemFailed {
                                    stage: stage_name.clone(),
                                    item_id: document_id.clone(),
                                    error: e.to_string(),
                                },
                            ));
                            return;
                        }

                        let manifest = Manifest {
                            document_id: document_id.clone(),
                            pages: page_count,
                        };
                        let manifest_key = format!("{}{}/manifest.json", pdf_pages_prefix, document_id);
                        let manifest_bytes = serde_json::to_vec(&manifest).unwrap_or_default();
                        match futures::executor::block_on(store.put(
                            &bucket,
                            &manifest_key,
                            manifest_bytes,
                            "application/json",
                        )) {
                            Ok(()) => {
                                futures::executor::block_on(audit.update(
                                    &document_id,
                                    DocumentStatus::Split,
                                    Some(page_count),
                                    Some("SPLIT"),
                                ))
                                .ok();
                                succeeded.fetch_add(1, Ordering::Relaxed);
                                let _ = futures::executor::block_on(event_tx.send(
                                    PipelineEvent::ItemCompleted {
                                        stage: stage_name.clone(),
                                        item_id: document_id.clone(),
                                        detail: Some(format!("{page_count} pages")),
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
                        tracing::error!("PDF splitter worker panicked: {}", e);
                    }
                }
            }
        }

        for h in handles {
            if let Err(e) = h.await {
                tracing::error!("PDF splitter worker panicked: {}", e);
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
