//! `config show`, `audit status`, `serve`: knobs, per-document status
//! lookups, and handing the already-bootstrapped backends to the HTTP
//! server surface.

use idp_server::AppState;

use crate::cli::bootstrap::Context;

pub fn config_show(ctx: &Context) {
    let p = &ctx.prefixes;
    println!("bucket               = {}", ctx.bucket);
    println!("raw                   = {}", p.raw);
    println!("office_docs           = {}", p.office_docs);
    println!("pdf_raw               = {}", p.pdf_raw);
    println!("pdf_pages             = {}", p.pdf_pages);
    println!("text_pages            = {}", p.text_pages);
    println!("scan_pages            = {}", p.scan_pages);
    println!("hocr                  = {}", p.hocr);
    println!("text_docs             = {}", p.text_docs);
    println!("pii                   = {}", p.pii);
    println!("redacted              = {}", p.redacted);
    println!("curated               = {}", p.curated);
    println!("invocation_prefix     = {}", ctx.invocation_prefix);
    println!("max_prompt_length     = {}", ctx.max_prompt_length);
    println!("classifier_model_id   = {}", ctx.classifier_model_id);
}

pub async fn audit_status(ctx: &Context, document_id: &str) -> anyhow::Result<()> {
    use idp_core::audit::AuditStore;

    match ctx.audit.get(document_id).await? {
        Some(record) => {
            println!("documentId = {}", record.document_id);
            println!("status     = {}", record.status.as_str());
            println!("pageCount  = {:?}", record.page_count);
            println!("info       = {:?}", record.info);
        }
        None => println!("no audit record for {document_id}"),
    }
    Ok(())
}

pub async fn serve(ctx: &Context, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState {
        store: ctx.store.clone(),
        audit: ctx.audit.clone(),
        bucket: ctx.bucket.clone(),
        prefixes: ctx.prefixes.clone(),
        embedder: ctx.embedder.clone(),
        chunker: ctx.chunker.clone(),
        vector_store: ctx.vector_store.clone(),
        reranker: ctx.reranker.clone(),
        invoker: ctx.invoker.clone(),
        heuristic: ctx.heuristic.clone(),
        generative: ctx.generative.clone(),
        invocation_prefix: ctx.invocation_prefix.clone(),
        max_prompt_length: ctx.max_prompt_length,
        classifier_model_id: ctx.classifier_model_id.clone(),
        weak_model_id: ctx.weak_model_id.clone(),
        strong_model_id: ctx.strong_model_id.clone(),
        prompt_engine: ctx.prompt_engine.clone(),
    };
    idp_server::serve(state, host, port).await
}
