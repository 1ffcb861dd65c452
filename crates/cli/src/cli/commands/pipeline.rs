//! `classify`, `split`, `page-classify`, `extract-text`, `ocr`, `combine`:
//! one `PipelineStage` wrapped in a `PipelineRunner` per subcommand,
//! grounded on `idp_core::work_queue::PipelineRunner`'s own doc comment
//! ("build one stage, push into a runner, call `run`, drain the event
//! channel").

use std::sync::Arc;

use idp_core::work_queue::{ExecutionStrategy, PipelineRunner};
use idp_pipeline::ocr::{default_manager, OcrBackendType, OcrConfig};
use idp_pipeline::stages::{
    ClassifierStage, CombineStage, OcrExtractorStage, OfficeExtractorStage, PageClassifierStage, SplitterStage,
    TextExtractorStage,
};
use tokio::sync::mpsc;

use crate::cli::bootstrap::Context;
use crate::cli::progress;

const CHUNK_SIZE: usize = 25;

async fn run_stages(stages: Vec<Box<dyn idp_core::work_queue::PipelineStage>>, limit: usize) -> anyhow::Result<()> {
    let mut runner = PipelineRunner::new(CHUNK_SIZE, limit);
    for stage in stages {
        runner.add_stage(stage);
    }
    let (tx, rx) = mpsc::channel(64);
    let drain = tokio::spawn(progress::drain(rx));
    runner.run(ExecutionStrategy::Wide, tx).await?;
    drain.await.ok();
    Ok(())
}

pub async fn classify(ctx: &Context, limit: usize) -> anyhow::Result<()> {
    let stage = ClassifierStage::new(ctx.store.clone(), ctx.audit.clone(), ctx.bucket.clone(), (*ctx.prefixes).clone());
    run_stages(vec![Box::new(stage)], limit).await
}

pub async fn split(ctx: &Context, limit: usize, workers: usize) -> anyhow::Result<()> {
    let stage =
        SplitterStage::new(ctx.store.clone(), ctx.audit.clone(), ctx.bucket.clone(), (*ctx.prefixes).clone(), workers);
    run_stages(vec![Box::new(stage)], limit).await
}

pub async fn page_classify(ctx: &Context, limit: usize, workers: usize, force_ocr: bool) -> anyhow::Result<()> {
    let stage = PageClassifierStage::new(ctx.store.clone(), ctx.bucket.clone(), (*ctx.prefixes).clone(), workers, force_ocr);
    run_stages(vec![Box::new(stage)], limit).await
}

/// Runs the Text Extractor and Office Extractor back to back: both claim
/// work from the `office-docs/` prefix, split only by which file extensions
/// each one recognizes (text-bearing PDFs vs. DOCX/PPTX/XLSX), so one
/// subcommand drains both rather than asking the caller to pick.
pub async fn extract_text(ctx: &Context, limit: usize, workers: usize) -> anyhow::Result<()> {
    let text_stage =
        TextExtractorStage::new(ctx.store.clone(), ctx.audit.clone(), ctx.bucket.clone(), (*ctx.prefixes).clone(), workers);
    let office_stage = OfficeExtractorStage::new(
        ctx.store.clone(),
        ctx.audit.clone(),
        ctx.bucket.clone(),
        (*ctx.prefixes).clone(),
        workers,
    );
    run_stages(vec![Box::new(text_stage), Box::new(office_stage)], limit).await
}

pub async fn ocr(ctx: &Context, limit: usize, workers: usize, dpi: u32, backend: String) -> anyhow::Result<()> {
    let backend_type = match backend.as_str() {
        "easyocr" => OcrBackendType::EasyOcr,
        "paddleocr" => OcrBackendType::PaddleOcr,
        "ocrmypdf" => OcrBackendType::OcrMyPdf,
        "trocr" => OcrBackendType::Trocr,
        "docling" => OcrBackendType::Docling,
        other => anyhow::bail!("unknown OCR backend: {other}"),
    };
    let config = OcrConfig { dpi, ..OcrConfig::default() };
    let manager = Arc::new(default_manager(backend_type, config));
    let stage = OcrExtractorStage::new(ctx.store.clone(), ctx.bucket.clone(), (*ctx.prefixes).clone(), manager, dpi, workers);
    run_stages(vec![Box::new(stage)], limit).await
}

pub async fn combine(ctx: &Context, limit: usize, requires_hocr: bool) -> anyhow::Result<()> {
    let stage = CombineStage::new(
        ctx.store.clone(),
        ctx.audit.clone(),
        ctx.bucket.clone(),
        (*ctx.prefixes).clone(),
        requires_hocr,
    );
    run_stages(vec![Box::new(stage)], limit).await
}
