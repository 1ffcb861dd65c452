//! Backend invocation, grounded on `llm_invocation/backends.py`: an
//! OpenAI-compatible Bedrock-equivalent backend and an Ollama-compatible
//! backend, each behind its own health-checked endpoint selector with
//! per-backend sampling-parameter defaults injected when the caller didn't
//! supply them. The source's direct `bedrock-runtime.invoke_model` path (no
//! HTTP endpoint, called only when no OpenAI-compatible endpoint is
//! configured) has no equivalent SDK crate in this workspace's stack and is
//! dropped; every Bedrock-equivalent call here goes through the
//! OpenAI-compatible HTTP surface.

use async_trait::async_trait;
use serde_json::{json, Value};

use idp_core::error::IdpError;

use super::selector::HealthCheckedSelector;

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn invoke(&self, prompt: &str, model: Option<&str>, system_prompt: Option<&str>) -> Result<String, IdpError>;
}

#[derive(Debug, Clone, Copy)]
pub struct BedrockDefaults {
    pub temperature: f32,
    pub num_ctx: u32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for BedrockDefaults {
    fn default() -> Self {
        Self { temperature: 0.5, num_ctx: 4096, max_tokens: 2048, top_p: 0.9, top_k: 50 }
    }
}

pub struct BedrockEquivalentBackend {
    client: reqwest::Client,
    selector: HealthCheckedSelector,
    api_key: Option<String>,
    defaults: BedrockDefaults,
}

impl BedrockEquivalentBackend {
    pub fn new(endpoints: Vec<String>, api_key: Option<String>, defaults: BedrockDefaults) -> Self {
        Self { client: reqwest::Client::new(), selector: HealthCheckedSelector::with_defaults(endpoints), api_key, defaults }
    }
}

#[async_trait]
impl LlmBackend for BedrockEquivalentBackend {
    async fn invoke(&self, prompt: &str, model: Option<&str>, system_prompt: Option<&str>) -> Result<String, IdpError> {
        let endpoint = self
            .selector
            .choose()
            .ok_or_else(|| IdpError::ConfigMissing("BEDROCK_OPENAI_ENDPOINTS".to_string()))?;

        let mut messages = Vec::new();
        if let Some(system) = system_prompt {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        let mut body = json!({
            "messages": messages,
            "temperature": self.defaults.temperature,
            "num_ctx": self.defaults.num_ctx,
            "max_tokens": self.defaults.max_tokens,
            "top_p": self.defaults.top_p,
            "top_k": self.defaults.top_k,
        });
        if let Some(model) = model {
            body["model"] = json!(model);
        }

        let mut request = self.client.post(&endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let result = request.send().await.and_then(|r| r.error_for_status());
        let response = match result {
            Ok(resp) => resp,
            Err(e) => {
                self.selector.record_failure(&endpoint);
                return Err(IdpError::LlmFailed(e.to_string()));
            }
        };

        let data: Value = response.json().await.map_err(|e| IdpError::LlmFailed(e.to_string()))?;
        self.selector.record_success(&endpoint);

        data["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| IdpError::LlmFailed("no choices in response".to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct OllamaDefaults {
    pub num_ctx: u32,
    pub repeat_last_n: u32,
    pub repeat_penalty: f32,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub min_p: f32,
    pub default_model: String,
}

impl Default for OllamaDefaults {
    fn default() -> Self {
        Self {
            num_ctx: 4096,
            repeat_last_n: 64,
            repeat_penalty: 1.1,
            temperature: 0.7,
            top_k: 40,
            top_p: 0.9,
            min_p: 0.05,
            default_model: String::new(),
        }
    }
}

pub struct OllamaEquivalentBackend {
    client: reqwest::Client,
    selector: HealthCheckedSelector,
    defaults: OllamaDefaults,
}

impl OllamaEquivalentBackend {
    pub fn new(endpoints: Vec<String>, defaults: OllamaDefaults) -> Self {
        Self { client: reqwest::Client::new(), selector: HealthCheckedSelector::with_defaults(endpoints), defaults }
    }
}

#[async_trait]
impl LlmBackend for OllamaEquivalentBackend {
    async fn invoke(&self, prompt: &str, model: Option<&str>, system_prompt: Option<&str>) -> Result<String, IdpError> {
        let endpoint = self.selector.choose().ok_or_else(|| IdpError::ConfigMissing("OLLAMA_ENDPOINTS".to_string()))?;

        let mut body = json!({
            "model": model.unwrap_or(&self.defaults.default_model),
            "prompt": prompt,
            "num_ctx": self.defaults.num_ctx,
            "repeat_last_n": self.defaults.repeat_last_n,
            "repeat_penalty": self.defaults.repeat_penalty,
            "temperature": self.defaults.temperature,
            "top_k": self.defaults.top_k,
            "top_p": self.defaults.top_p,
            "min_p": self.defaults.min_p,
        });
        if let Some(system) = system_prompt {
            body["system"] = json!(system);
        }

        let result = self.client.post(&endpoint).json(&body).send().await.and_then(|r| r.error_for_status());
        let response = match result {
            Ok(resp) => resp,
            Err(e) => {
                self.selector.record_failure(&endpoint);
                return Err(IdpError::LlmFailed(e.to_string()));
            }
        };

        let data: Value = response.json().await.map_err(|e| IdpError::LlmFailed(e.to_string()))?;
        self.selector.record_success(&endpoint);

        data["response"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| IdpError::LlmFailed("no response field".to_string()))
    }
}
