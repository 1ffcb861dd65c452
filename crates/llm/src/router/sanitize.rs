//! Request validation, grounded on `router-lambda/app.py`'s `_sanitize_payload`:
//! bounds the prompt length, checks `backend` against an allowlist, and
//! strips non-printable characters and injection-prone HTML sigils.

use serde_json::Value;

use idp_core::error::IdpError;

pub const ALLOWED_BACKENDS: &[&str] = &["bedrock", "ollama"];
pub const DEFAULT_MAX_PROMPT_LENGTH: usize = 4096;

pub fn sanitize_payload(payload: &mut Value, max_prompt_length: usize) -> Result<(), IdpError> {
    let prompt = payload
        .get("prompt")
        .and_then(|v| v.as_str())
        .ok_or_else(|| IdpError::InputInvalid("prompt must be a string".to_string()))?
        .to_string();

    if prompt.len() > max_prompt_length {
        return Err(IdpError::InputInvalid("prompt too long".to_string()));
    }

    if let Some(backend) = payload.get("backend").and_then(|v| v.as_str()) {
        if !ALLOWED_BACKENDS.contains(&backend) {
            return Err(IdpError::InputInvalid("unsupported backend".to_string()));
        }
    }

    payload["prompt"] = Value::String(strip_unsafe(&prompt));
    Ok(())
}

fn strip_unsafe(prompt: &str) -> String {
    prompt
        .chars()
        .filter(|c| (' '..='~').contains(c))
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\''))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_non_printable_and_html_sigils() {
        let mut payload = json!({"prompt": "hi <script>\u{0007}</script>"});
        sanitize_payload(&mut payload, DEFAULT_MAX_PROMPT_LENGTH).unwrap();
        assert_eq!(payload["prompt"], "hi script/script");
    }

    #[test]
    fn rejects_backend_outside_allowlist() {
        let mut payload = json!({"prompt": "hi", "backend": "anthropic"});
        let err = sanitize_payload(&mut payload, DEFAULT_MAX_PROMPT_LENGTH).unwrap_err();
        assert!(matches!(err, IdpError::InputInvalid(_)));
    }

    #[test]
    fn rejects_overlong_prompt() {
        let mut payload = json!({"prompt": "a".repeat(10)});
        let err = sanitize_payload(&mut payload, 5).unwrap_err();
        assert!(matches!(err, IdpError::InputInvalid(_)));
    }
}
