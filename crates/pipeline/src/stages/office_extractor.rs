//! Office Extractor (C10): DOCX becomes one Markdown page; PPTX becomes one
//! page per slide; XLSX becomes one page per sheet rendered as a Markdown
//! table (empty cells serialize as empty strings). Writes `text-docs/{doc}.json`
//! directly, the same no-split/no-combine shape as the Text Extractor's
//! text-bearing-PDF path.

use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use quick_xml::events::Event;
use quick_xml::reader::Reader as XmlReader;
use tokio::sync::{mpsc, Mutex};
use zip::ZipArchive;

use idp_core::audit::AuditStore;
use idp_core::config::PrefixConfig;
use idp_core::error::IdpError;
use idp_core::models::{DocumentStatus, DocumentText, PageText};
use idp_core::object_store::ObjectStore;
use idp_core::work_queue::object_queue::ObjectQueue;
use idp_core::work_queue::{ChunkResult, PipelineError, PipelineEvent, PipelineStage, WorkFilter, WorkQueue};

use super::ids::document_id_from_key;

pub struct OfficeExtractorStage {
    store: Arc<dyn ObjectStore>,
    audit: Arc<dyn AuditStore>,
    queue: ObjectQueue<Arc<dyn ObjectStore>>,
    bucket: String,
    prefixes: PrefixConfig,
    workers: usize,
    cursor: Mutex<Option<String>>,
}

impl OfficeExtractorStage {
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

/// This stage claims everything under `office-docs/` except the `.pdf` keys
/// the Text Extractor already owns.
fn is_office_key(key: &str) -> bool {
    !key.ends_with(".pdf")
}

fn extension(key: &str) -> Option<&str> {
    key.rsplit('.').next()
}

/// One Markdown page built from every `<w:t>` run in `word/document.xml`,
/// paragraphs (`<w:p>`) separated by blank lines.
fn extract_docx(bytes: &[u8]) -> Result<Vec<String>, IdpError> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| IdpError::ParseError(format!("malformed DOCX: {e}")))?;
    let mut xml = String::new();
    zip.by_name("word/document.xml")
        .map_err(|e| IdpError::ParseError(format!("DOCX missing document.xml: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| IdpError::Other(e.into()))?;

    let mut reader = XmlReader::from_str(&xml);
    reader.config_mut().trim_text(false);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"t" => in_text = false,
            Ok(Event::Text(t)) if in_text => {
                current.push_str(&t.unescape().unwrap_or_default());
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"p" => {
                paragraphs.push(std::mem::take(&mut current));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(IdpError::ParseError(format!("malformed DOCX XML: {e}"))),
            _ => {}
        }
        buf.clear();
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    let body = paragraphs
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    Ok(vec![PageText::render(1, &body)])
}

/// One page per `ppt/slides/slideN.xml`, each page's Markdown built from
/// every `<a:t>` run on that slide.
fn extract_pptx(bytes: &[u8]) -> Result<Vec<String>, IdpError> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| IdpError::ParseError(format!("malformed PPTX: {e}")))?;

    let mut slide_names: Vec<(u32, String)> = (0..zip.len())
        .filter_map(|i| {
            let name = zip.by_index(i).ok()?.name().to_string();
            let rest = name.strip_prefix("ppt/slides/slide")?;
            let number: u32 = rest.strip_suffix(".xml")?.parse().ok()?;
            Some((number, name))
        })
        .collect();
    slide_names.sort_by_key(|(n, _)| *n);

    let mut pages = Vec::with_capacity(slide_names.len());
    for (page_number, (_, name)) in slide_names.into_iter().enumerate() {
        let mut xml = String::new();
        zip.by_name(&name)
            .map_err(|e| IdpError::ParseError(format!("PPTX missing {name}: {e}")))?
            .read_to_string(&mut xml)
            .map_err(|e| IdpError::Other(e.into()))?;

        let mut reader = XmlReader::from_str(&xml);
        reader.config_mut().trim_text(false);
        let mut texts = Vec::new();
        let mut in_text = false;
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
                Ok(Event::End(e)) if e.local_name().as_ref() == b"t" => in_text = false,
                Ok(Event::Text(t)) if in_text => texts.push(t.unescape().unwrap_or_default().to_string()),
                Ok(Event::Eof) => break,
                Err(e) => return Err(IdpError::ParseError(format!("malformed PPTX XML: {e}"))),
                _ => {}
            }
            buf.clear();
        }
        pages.push(PageText::render(page_number as u32 + 1, &texts.join("\n")));
    }
    Ok(pages)
}

/// One page per sheet, each a Markdown table (header row = first row).
fn extract_xlsx(bytes: &[u8]) -> Result<Vec<String>, IdpError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook: Xlsx<_> = open_workbook_from_rs(cursor)
        .map_err(|e| IdpError::ParseError(format!("malformed XLSX: {e}")))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let mut pages = Vec::with_capacity(sheet_names.len());
    for (page_number, sheet) in sheet_names.iter().enumerate() {
        let range = workbook
            .worksheet_range(sheet)
            .map_err(|e| IdpError::ParseError(format!("XLSX sheet {sheet}: {e}")))?;

        let mut rows = range.rows();
        let header = rows.next();
        let mut md = String::new();
        if let Some(header) = header {
            md.push_str(&render_row(header));
            md.push('\n');
            md.push_str(&format!("|{}\n", " --- |".repeat(header.len())));
        }
        for row in rows {
            md.push_str(&render_row(row));
            md.push('\n');
        }
        pages.push(PageText::render(page_number as u32 + 1, md.trim_end()));
    }
    Ok(pages)
}

fn render_row(row: &[Data]) -> String {
    let cells: Vec<String> = row
        .iter()
        .map(|cell| match cell {
            Data::Empty => String::new(),
            other => other.to_string(),
        })
        .collect();
    format!("| {} |", cells.join(" | "))
}

fn extract_office_doc(ext: &str, bytes: &[u8]) -> Result<Vec<String>, IdpError> {
    match ext {
        "docx" => extract_docx(bytes),
        "pptx" => extract_pptx(bytes),
        "xlsx" => extract_xlsx(bytes),
        other => Err(IdpError::InputInvalid(format!("unsupported office extension: {other}"))),
    }
}

#[async_trait]
impl PipelineStage for OfficeExtractorStage {
    fn name(&self) -> &str {
        "Office Extractor"
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
            if !is_office_key(&item.key) {
                continue;
            }
            let work_handle = self.queue.claim(item, &filter).await?;
            self.queue.complete(work_handle).await?;

            let Some(ext) = extension(&item.key).map(|e| e.to_string()) else {
                skipped.fetch_add(1, Ordering::Relaxed);
                let _ = event_tx
                    .send(PipelineEvent::ItemSkipped {
                        stage: stage_name.clone(),
                        item_id: item.key.clone(),
                    })
                    .await;
                continue;
            };

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
                    .and_then(|bytes| extract_office_doc(&ext, &bytes));

                match result {
                    Ok(pages) => {
                        let page_count = pages.len() as u32;
                        let doc_text = DocumentText {
                            document_id: document_id.clone(),
                            doc_type: ext.clone(),
                            page_count,
                            pages,
                        };
                        let dest = format!("{}{}.json", text_docs_prefix, document_id);
                        let body = serde_json::to_vec(&doc_text).unwrap_or_default();
                        match futures::executor::block_on(store.put(&bucket, &dest, body, "application/json")) {
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
                        tracing::error!("Office extractor worker panicked: {}", e);
                    }
                }
            }
        }

        for h in handles {
            if let Err(e) = h.await {
                tracing::error!("Office extractor worker panicked: {}", e);
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
