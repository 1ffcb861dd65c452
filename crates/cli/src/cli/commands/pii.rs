//! `detect-pii`, `redact`: one `PipelineStage` each, same
//! `PipelineRunner` shape as the document-pipeline subcommands.

use std::sync::Arc;

use idp_core::work_queue::{ExecutionStrategy, PipelineRunner};
use idp_pii::{PiiDetector, PiiDetectorStage, RedactorStage};
use tokio::sync::mpsc;

use crate::cli::bootstrap::Context;
use crate::cli::progress;

const CHUNK_SIZE: usize = 25;

async fn run_stage(stage: Box<dyn idp_core::work_queue::PipelineStage>, limit: usize) -> anyhow::Result<()> {
    let mut runner = PipelineRunner::new(CHUNK_SIZE, limit);
    runner.add_stage(stage);
    let (tx, rx) = mpsc::channel(64);
    let drain = tokio::spawn(progress::drain(rx));
    runner.run(ExecutionStrategy::Wide, tx).await?;
    drain.await.ok();
    Ok(())
}

pub async fn detect_pii(ctx: &Context, limit: usize) -> anyhow::Result<()> {
    let detector = Arc::new(PiiDetector::from_resolver(&ctx.resolver, &ctx.resolve_ctx()));
    let stage = PiiDetectorStage::new(
        ctx.store.clone(),
        ctx.audit.clone(),
        ctx.bucket.clone(),
        (*ctx.prefixes).clone(),
        ctx.resolver.clone(),
        detector,
    );
    run_stage(Box::new(stage), limit).await
}

pub async fn redact(ctx: &Context, limit: usize) -> anyhow::Result<()> {
    let stage = RedactorStage::new(
        ctx.store.clone(),
        ctx.audit.clone(),
        ctx.bucket.clone(),
        (*ctx.prefixes).clone(),
        ctx.resolver.clone(),
    );
    run_stage(Box::new(stage), limit).await
}
