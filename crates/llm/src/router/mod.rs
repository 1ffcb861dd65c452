//! LLM Router (C20), grounded on `router-lambda/app.py` and `main_router.py`'s
//! `CascadingRouter`: validates and sanitizes the request, picks a backend
//! (explicit choice, or cascade through heuristic -> predictive -> generative,
//! first non-abstaining stage wins), and enqueues `{backend, prompt, ...}`
//! for the Invoker rather than calling a backend itself.

mod generative;
mod heuristic;
mod predictive;
mod sanitize;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use idp_core::error::IdpError;
use idp_core::object_store::ObjectStore;

pub use generative::GenerativeRouter;
pub use heuristic::{HeuristicRouter, LengthOp, LengthUnit, Rule};
pub use predictive::{classifier_prompt, parse_classification, Complexity, PredictiveRouter, PromptClassifier};
pub use sanitize::{sanitize_payload, ALLOWED_BACKENDS, DEFAULT_MAX_PROMPT_LENGTH};

pub const DEFAULT_PROMPT_COMPLEXITY_THRESHOLD: usize = 20;

/// Phrases that mark a response as a refusal/non-answer, and the minimum
/// word count otherwise required, per `cascading_router.py`'s
/// `is_response_sufficient`. Exposed so the Invoker can decide whether to
/// escalate a weak-model response to the strong model.
const INSUFFICIENT_PHRASES: &[&str] =
    &["i can't", "i am unable", "i do not know", "as an ai", "i cannot provide"];

pub fn is_response_sufficient(response: &str) -> bool {
    let lower = response.to_lowercase();
    if INSUFFICIENT_PHRASES.iter().any(|p| lower.contains(p)) {
        return false;
    }
    response.split_whitespace().count() >= 20
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteDecision {
    pub backend: String,
    pub model: Option<String>,
    pub trace: Vec<String>,
    pub queued: bool,
}

pub struct LlmRouter<'a, S: ObjectStore> {
    store: &'a S,
    bucket: String,
    invocation_prefix: String,
    heuristic: HeuristicRouter,
    predictive: Option<PredictiveRouter<'a>>,
    generative: GenerativeRouter,
    max_prompt_length: usize,
}

impl<'a, S: ObjectStore> LlmRouter<'a, S> {
    pub fn new(
        store: &'a S,
        bucket: impl Into<String>,
        invocation_prefix: impl Into<String>,
        heuristic: HeuristicRouter,
        predictive: Option<PredictiveRouter<'a>>,
        generative: GenerativeRouter,
        max_prompt_length: usize,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            invocation_prefix: invocation_prefix.into(),
            heuristic,
            predictive,
            generative,
            max_prompt_length,
        }
    }

    /// Validates and routes `payload` (expected to carry at least a
    /// `prompt` string), enqueuing the decorated request for the Invoker and
    /// returning the chosen backend — mirroring the 202-queued contract of
    /// the source router Lambda.
    pub async fn route(&self, mut payload: Value) -> Result<RouteDecision, IdpError> {
        sanitize_payload(&mut payload, self.max_prompt_length)?;
        let prompt = payload["prompt"].as_str().unwrap_or("").to_string();

        let explicit_backend = payload.get("backend").and_then(|v| v.as_str()).map(str::to_string);
        let (backend, model, trace) = if let Some(backend) = explicit_backend {
            (backend, payload.get("model").and_then(|v| v.as_str()).map(str::to_string), Vec::new())
        } else {
            self.cascade(&prompt).await?
        };

        payload["backend"] = Value::String(backend.clone());
        if let Some(model) = &model {
            payload["model"] = Value::String(model.clone());
        }
        payload.as_object_mut().map(|o| o.remove("strategy"));

        let key = format!("{}{}.json", self.invocation_prefix, Uuid::new_v4());
        let body = serde_json::to_vec(&payload).map_err(|e| IdpError::Other(e.into()))?;
        self.store.put(&self.bucket, &key, body, "application/json").await?;

        Ok(RouteDecision { backend, model, trace, queued: true })
    }

    async fn cascade(&self, prompt: &str) -> Result<(String, Option<String>, Vec<String>), IdpError> {
        if let Some((backend, trace)) = self.heuristic.try_route(prompt) {
            return Ok((backend, None, trace));
        }
        if let Some(predictive) = &self.predictive {
            if let Ok((backend, model)) = predictive.try_route(prompt).await {
                return Ok((backend, model, vec!["Predictive stage selected a backend.".to_string()]));
            }
        }
        Ok((self.generative.route(), None, vec!["Cascaded to generative fallback.".to_string()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sufficiency_rejects_refusals_and_short_replies() {
        assert!(!is_response_sufficient("I am unable to help with that."));
        assert!(!is_response_sufficient("short reply"));
        assert!(is_response_sufficient(&"word ".repeat(25)));
    }
}
