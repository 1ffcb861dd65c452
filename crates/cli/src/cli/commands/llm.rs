//! `route`, `invoke`: build a fresh `LlmRouter`/`PredictiveRouter` per
//! call, same per-request construction the HTTP server's `/route`
//! handler uses (`LlmRouter` borrows its `ObjectStore` for one call).

use serde_json::Value;

use idp_llm::{InvokerClassifier, LlmRouter, PredictiveRouter};

use crate::cli::bootstrap::Context;

pub async fn route(ctx: &Context, payload: Value) -> anyhow::Result<()> {
    let classifier = InvokerClassifier::new(&ctx.invoker, ctx.classifier_model_id.clone());
    let predictive = Some(PredictiveRouter::new(&classifier, ctx.weak_model_id.clone(), ctx.strong_model_id.clone()));
    let router = LlmRouter::new(
        &ctx.store,
        ctx.bucket.clone(),
        ctx.invocation_prefix.clone(),
        (*ctx.heuristic).clone(),
        predictive,
        (*ctx.generative).clone(),
        ctx.max_prompt_length,
    );

    let decision = router.route(payload).await?;
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

pub async fn invoke(ctx: &Context, payload: Value) -> anyhow::Result<()> {
    let reply = ctx.invoker.invoke(&payload).await?;
    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}
