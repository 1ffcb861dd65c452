//! Predictive strategy (second cascade stage), grounded on `predictive_router.py`:
//! invokes a classifier model to label the prompt `simple` or `complex` and
//! maps the label onto a weak/strong backend pair.

use async_trait::async_trait;

use idp_core::error::IdpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complexity {
    Simple,
    Complex,
}

/// The seam a real classifier call plugs into; `InvokerClassifier` (in the
/// `invoker` module) is the concrete implementation that actually calls a
/// backend, kept separate here so this module doesn't depend on `invoker`.
#[async_trait]
pub trait PromptClassifier: Send + Sync {
    async fn classify(&self, prompt: &str) -> Result<Complexity, IdpError>;
}

pub fn classifier_prompt(prompt: &str) -> String {
    format!(
        "You are a prompt complexity classifier. Your task is to classify the \
following user prompt as either 'simple' or 'complex'.\n\n\
- A 'simple' prompt can be answered with a short, factual statement, a \
brief summary, or a direct question.\n\
- A 'complex' prompt requires multi-step reasoning, in-depth explanation, \
creative content generation, or code generation.\n\n\
Respond with only a single word: 'simple' or 'complex'.\n\n\
User prompt to classify: \"{prompt}\""
    )
}

/// Parses a raw classifier reply the way the source does: substring match
/// on "complex" first, then "simple", defaulting to simple on anything else.
pub fn parse_classification(raw: &str) -> Complexity {
    let lower = raw.trim().to_lowercase();
    if lower.contains("complex") {
        Complexity::Complex
    } else {
        Complexity::Simple
    }
}

pub struct PredictiveRouter<'a> {
    classifier: &'a dyn PromptClassifier,
    weak_model_id: Option<String>,
    strong_model_id: Option<String>,
}

impl<'a> PredictiveRouter<'a> {
    pub fn new(classifier: &'a dyn PromptClassifier, weak_model_id: Option<String>, strong_model_id: Option<String>) -> Self {
        Self { classifier, weak_model_id, strong_model_id }
    }

    /// Classifies `prompt` and returns `(backend, model)`; always routes to
    /// the `bedrock`-equivalent backend, varying only the model id, matching
    /// `PredictiveRouter.try_route`'s unconditional `routed["backend"] = "bedrock"`.
    pub async fn try_route(&self, prompt: &str) -> Result<(String, Option<String>), IdpError> {
        let complexity = self.classifier.classify(prompt).await?;
        let model = match complexity {
            Complexity::Complex => self.strong_model_id.clone(),
            Complexity::Simple => self.weak_model_id.clone(),
        };
        Ok(("bedrock".to_string(), model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complex_before_simple() {
        assert_eq!(parse_classification("Complex"), Complexity::Complex);
        assert_eq!(parse_classification("simple"), Complexity::Simple);
        assert_eq!(parse_classification("unsure"), Complexity::Simple);
    }
}
