//! Prompt Engine (C22), grounded on `prompt-engine-lambda/app.py`: stores
//! prompt templates keyed by `(prompt_id, version)`, renders them with
//! `str.format`-style variable substitution, and forwards the rendered
//! prompt to the LLM Router.

use std::collections::HashMap;

use idp_core::error::IdpError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub prompt_id: String,
    pub version: u32,
    pub template: String,
}

/// In-memory prompt library. The source backs this with a DynamoDB-style
/// table (`scan` + sort-by-version-descending for "latest"); this keeps the
/// same latest-wins lookup semantics over a plain map.
#[derive(Default)]
pub struct PromptLibrary {
    templates: HashMap<String, Vec<PromptTemplate>>,
}

impl PromptLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, template: PromptTemplate) {
        self.templates.entry(template.prompt_id.clone()).or_default().push(template);
    }

    fn get(&self, prompt_id: &str, version: Option<u32>) -> Result<&PromptTemplate, IdpError> {
        let versions = self
            .templates
            .get(prompt_id)
            .ok_or_else(|| IdpError::NotFound(format!("prompt '{prompt_id}'")))?;

        if let Some(version) = version {
            if let Some(found) = versions.iter().find(|t| t.version == version) {
                return Ok(found);
            }
        }

        versions
            .iter()
            .max_by_key(|t| t.version)
            .ok_or_else(|| IdpError::NotFound(format!("prompt '{prompt_id}'")))
    }
}

/// Substitutes `{name}`-style placeholders, failing on any variable the
/// caller didn't supply — the Rust analogue of the source's
/// `template.format(**variables)` `KeyError`-on-missing-variable behavior.
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> Result<String, IdpError> {
    let mut rendered = String::with_capacity(template.len());
    let bytes = template.as_bytes();

    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = template[i + 1..].find('}') {
                let name = &template[i + 1..i + 1 + end];
                let value = variables
                    .get(name)
                    .ok_or_else(|| IdpError::InputInvalid(format!("missing variable: {name}")))?;
                rendered.push_str(value);
                i += end + 2;
                continue;
            }
        }
        let ch = template[i..].chars().next().unwrap();
        rendered.push(ch);
        i += ch.len_utf8();
    }
    Ok(rendered)
}

pub struct PromptEngine {
    library: PromptLibrary,
}

impl PromptEngine {
    pub fn new(library: PromptLibrary) -> Self {
        Self { library }
    }

    pub fn register(&mut self, template: PromptTemplate) {
        self.library.register(template);
    }

    /// Renders `prompt_id`/`version` with `variables` and returns the
    /// rendered prompt text, ready to be handed to the Router.
    pub fn render(
        &self,
        prompt_id: &str,
        version: Option<u32>,
        variables: &HashMap<String, String>,
    ) -> Result<String, IdpError> {
        let template = self.library.get(prompt_id, version)?;
        render_template(&template.template, variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn renders_known_variables() {
        let rendered = render_template("Summarize {topic} for {audience}.", &vars(&[("topic", "the memo"), ("audience", "execs")]));
        assert_eq!(rendered.unwrap(), "Summarize the memo for execs.");
    }

    #[test]
    fn missing_variable_fails() {
        let err = render_template("Hello {name}", &vars(&[])).unwrap_err();
        assert!(matches!(err, IdpError::InputInvalid(_)));
    }

    #[test]
    fn latest_version_wins_without_explicit_version() {
        let mut library = PromptLibrary::new();
        library.register(PromptTemplate { prompt_id: "p".to_string(), version: 1, template: "v1".to_string() });
        library.register(PromptTemplate { prompt_id: "p".to_string(), version: 2, template: "v2".to_string() });
        let engine = PromptEngine::new(library);
        assert_eq!(engine.render("p", None, &HashMap::new()).unwrap(), "v2");
    }
}
