//! `prompt register`, `prompt render` (C22): stores a template in the
//! in-process `PromptLibrary` and renders+routes a stored template, same
//! resolve-then-route flow as the server's `/prompts/render` handler.

use std::collections::HashMap;

use idp_llm::{InvokerClassifier, LlmRouter, PredictiveRouter, PromptTemplate};
use serde_json::Value;

use crate::cli::bootstrap::Context;

pub async fn register(ctx: &Context, prompt_id: String, version: u32, template: String) -> anyhow::Result<()> {
    ctx.prompt_engine.write().await.register(PromptTemplate { prompt_id, version, template });
    println!("registered");
    Ok(())
}

pub async fn render(ctx: &Context, prompt_id: &str, version: Option<u32>, variables: HashMap<String, String>, mut extra: Value) -> anyhow::Result<()> {
    let rendered = ctx.prompt_engine.read().await.render(prompt_id, version, &variables)?;

    if !extra.is_object() {
        extra = Value::Object(Default::default());
    }
    extra["prompt"] = Value::String(rendered);

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

    let decision = router.route(extra).await?;
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}
