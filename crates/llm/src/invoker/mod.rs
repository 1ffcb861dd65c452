//! LLM Invoker (C21), grounded on `llm-invocation/invoke-lambda/app.py`:
//! dispatches a routed request to the backend named in `payload.backend`,
//! posts it, and normalizes the reply into `{"reply": ...}`.

mod backend;
mod selector;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use idp_core::error::IdpError;

pub use backend::{BedrockDefaults, BedrockEquivalentBackend, LlmBackend, OllamaDefaults, OllamaEquivalentBackend};
pub use selector::HealthCheckedSelector;

use crate::router::{classifier_prompt, is_response_sufficient, parse_classification, Complexity, PromptClassifier};

pub struct Invoker {
    bedrock: Arc<dyn LlmBackend>,
    ollama: Arc<dyn LlmBackend>,
}

impl Invoker {
    pub fn new(bedrock: Arc<dyn LlmBackend>, ollama: Arc<dyn LlmBackend>) -> Self {
        Self { bedrock, ollama }
    }

    fn backend_for(&self, name: &str) -> &Arc<dyn LlmBackend> {
        match name {
            "ollama" => &self.ollama,
            _ => &self.bedrock,
        }
    }

    /// Invokes the backend named in `payload.backend` with `payload.prompt`
    /// (and optional `payload.model`/`payload.system_prompt`), returning a
    /// normalized `{"reply": ...}` object.
    pub async fn invoke(&self, payload: &Value) -> Result<Value, IdpError> {
        let backend_name = payload
            .get("backend")
            .and_then(|v| v.as_str())
            .ok_or_else(|| IdpError::InputInvalid("backend missing".to_string()))?;
        let prompt = payload
            .get("prompt")
            .and_then(|v| v.as_str())
            .ok_or_else(|| IdpError::InputInvalid("prompt missing".to_string()))?;
        let model = payload.get("model").and_then(|v| v.as_str());
        let system_prompt = payload.get("system_prompt").and_then(|v| v.as_str());

        let reply = self.backend_for(backend_name).invoke(prompt, model, system_prompt).await?;
        Ok(json!({ "reply": reply }))
    }

    /// Weak/strong escalation, grounded on `cascading_router.py`'s
    /// `handle_cascading_route`: invokes the weak model first, and only
    /// calls the strong model if `is_response_sufficient` rejects the weak
    /// reply. Both calls go through the `bedrock`-equivalent backend, as in
    /// the source.
    pub async fn invoke_with_escalation(
        &self,
        prompt: &str,
        weak_model_id: &str,
        strong_model_id: &str,
    ) -> Result<(String, String, Vec<String>), IdpError> {
        let weak_reply = self.bedrock.invoke(prompt, Some(weak_model_id), None).await?;
        if is_response_sufficient(&weak_reply) {
            return Ok((weak_model_id.to_string(), weak_reply, vec!["weak model response was sufficient".to_string()]));
        }
        let strong_reply = self.bedrock.invoke(prompt, Some(strong_model_id), None).await?;
        Ok((
            strong_model_id.to_string(),
            strong_reply,
            vec!["weak model response was insufficient; escalated to strong model".to_string()],
        ))
    }
}

/// Wires the Predictive Router's classifier seam to a real backend call,
/// grounded on `predictive_router.py`'s `invoke_classifier`.
pub struct InvokerClassifier<'a> {
    invoker: &'a Invoker,
    classifier_model_id: String,
}

impl<'a> InvokerClassifier<'a> {
    pub fn new(invoker: &'a Invoker, classifier_model_id: impl Into<String>) -> Self {
        Self { invoker, classifier_model_id: classifier_model_id.into() }
    }
}

#[async_trait]
impl<'a> PromptClassifier for InvokerClassifier<'a> {
    async fn classify(&self, prompt: &str) -> Result<Complexity, IdpError> {
        let reply = self.invoker.bedrock.invoke(&classifier_prompt(prompt), Some(&self.classifier_model_id), None).await?;
        Ok(parse_classification(&reply))
    }
}
