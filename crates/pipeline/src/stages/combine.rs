//! Combine Stage (C11): joins a document's split pages back into
//! `text-docs/{doc}.json` once every page has landed in `text-pages/`.
//!
//! Modeled as a `PipelineStage` over `pdf-pages/*/manifest.json` rather than
//! a push-triggered listener, the same polling shape the corpus gives every
//! other stage here — the manifest's presence is exactly the "triggered by
//! any page-text write, but the document isn't ready until split finishes"
//! condition the algorithm describes. Idempotent: re-running after a
//! successful combine reads the same pages and writes the same bytes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use idp_core::audit::AuditStore;
use idp_core::config::PrefixConfig;
use idp_core::error::IdpError;
use idp_core::models::{DocumentStatus, DocumentText, Hocr, HocrPage, Manifest};
use idp_core::object_store::ObjectStore;
use idp_core::work_queue::object_queue::ObjectQueue;
use idp_core::work_queue::{ChunkResult, PipelineError, PipelineEvent, PipelineStage, WorkFilter, WorkQueue};

pub struct CombineStage {
    store: Arc<dyn ObjectStore>,
    audit: Arc<dyn AuditStore>,
    queue: ObjectQueue<Arc<dyn ObjectStore>>,
    bucket: String,
    prefixes: PrefixConfig,
    requires_hocr: bool,
    cursor: Mutex<Option<String>>,
}

impl CombineStage {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        audit: Arc<dyn AuditStore>,
        bucket: impl Into<String>,
        prefixes: PrefixConfig,
        requires_hocr: bool,
    ) -> Self {
        let bucket = bucket.into();
        let queue = ObjectQueue::new(store.clone(), bucket.clone(), prefixes.pdf_pages.clone());
        Self {
            store,
            audit,
            queue,
            bucket,
            prefixes,
            requires_hocr,
            cursor: Mutex::new(None),
        }
    }

    fn filter(&self) -> WorkFilter {
        WorkFilter {
            mime_type: Some("manifest.json".to_string()),
            ..Default::default()
        }
    }

    fn document_id_of(&self, manifest_key: &str) -> Option<String> {
        let rest = manifest_key.strip_prefix(&self.prefixes.pdf_pages)?;
        let (doc, _) = rest.split_once('/')?;
        Some(doc.to_string())
    }
}

/// Runs the 4-step combine algorithm for one document. Returns `Ok(Some(..))`
/// with a status string on success/missing-pages, `Ok(None)` if the manifest
/// itself is absent (nothing to do yet).
async fn combine_document(
    store: &Arc<dyn ObjectStore>,
    bucket: &str,
    prefixes: &PrefixConfig,
    document_id: &str,
    requires_hocr: bool,
) -> Result<&'static str, IdpError> {
    let manifest_key = format!("{}{}/manifest.json", prefixes.pdf_pages, document_id);
    let manifest_bytes = match store.get(bucket, &manifest_key).await {
        Ok(b) => b,
        Err(_) => return Ok("NO_MANIFEST"),
    };
    let manifest: Manifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| IdpError::ParseError(format!("malformed manifest: {e}")))?;

    for i in 1..=manifest.pages {
        let page_key = format!("{}{}/page_{:03}.md", prefixes.text_pages, document_id, i);
        if store.head(bucket, &page_key).await?.is_none() {
            return Ok("MISSING_PAGES");
        }
    }
    if requires_hocr {
        for i in 1..=manifest.pages {
            let hocr_key = format!("{}{}/page_{:03}.json", prefixes.hocr, document_id, i);
            if store.head(bucket, &hocr_key).await?.is_none() {
                return Ok("MISSING_PAGES");
            }
        }
    }

    let mut pages = Vec::with_capacity(manifest.pages as usize);
    let mut hocr_pages = Vec::with_capacity(if requires_hocr { manifest.pages as usize } else { 0 });
    for i in 1..=manifest.pages {
        let page_key = format!("{}{}/page_{:03}.md", prefixes.text_pages, document_id, i);
        let bytes = store.get(bucket, &page_key).await?;
        pages.push(String::from_utf8_lossy(&bytes).into_owned());

        if requires_hocr {
            let hocr_key = format!("{}{}/page_{:03}.json", prefixes.hocr, document_id, i);
            let hocr_bytes = store.get(bucket, &hocr_key).await?;
            let hocr_page: HocrPage = serde_json::from_slice(&hocr_bytes)
                .map_err(|e| IdpError::ParseError(format!("malformed hOCR page: {e}")))?;
            hocr_pages.push(hocr_page);
        }
    }

    let doc_text = DocumentText {
        document_id: document_id.to_string(),
        doc_type: "pdf".to_string(),
        page_count: manifest.pages,
        pages,
    };
    let dest = format!("{}{}.json", prefixes.text_docs, document_id);
    let body = serde_json::to_vec(&doc_text).unwrap_or_default();
    store.put(bucket, &dest, body, "application/json").await?;

    if requires_hocr {
        let hocr = Hocr {
            document_id: document_id.to_string(),
            pages: hocr_pages,
        };
        let hocr_dest = format!("{}{}.json", prefixes.hocr, document_id);
        let hocr_body = serde_json::to_vec(&hocr).unwrap_or_default();
        store.put(bucket, &hocr_dest, hocr_body, "application/json").await?;
    }

    Ok("COMBINED")
}

#[async_trait]
impl PipelineStage for CombineStage {
    fn name(&self) -> &str {
        "Combine Stage"
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

            let Some(document_id) = self.document_id_of(&item.key) else {
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
                    item_id: document_id.clone(),
                    label: item.key.clone(),
                })
                .await;

            let result = combine_document(
                &self.store,
                &self.bucket,
                &self.prefixes,
                &document_id,
                self.requires_hocr,
            )
            .await;

            match result {
                Ok("NO_MANIFEST") => {
                    skipped.fetch_add(1, Ordering::Relaxed);
                    let _ = event_tx
                        .send(PipelineEvent::ItemSkipped {
                            stage: stage_name.clone(),
                            item_id: document_id.clone(),
                        })
                        .await;
                }
                Ok("MISSING_PAGES") => {
                    let _ = self
                        .audit
                        .update(&document_id, DocumentStatus::MissingPages, None, Some("MISSING_PAGES"))
                        .await;
                    skipped.fetch_add(1, Ordering::Relaxed);
                    let _ = event_tx
                        .send(PipelineEvent::ItemSkipped {
                            stage: stage_name.clone(),
                            item_id: document_id.clone(),
                        })
                        .await;
                }
                Ok(_) => {
                    let _ = self
                        .audit
                        .update(&document_id, DocumentStatus::Combined, None, Some("COMBINED"))
                        .await;
                    succeeded.fetch_add(1, Ordering::Relaxed);
                    let _ = event_tx
                        .send(PipelineEvent::ItemCompleted {
                            stage: stage_name.clone(),
                            item_id: document_id.clone(),
                            detail: None,
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
            skipped: skipped.load(Ordering::Relaxed),
            has_more,
        })
    }
}
