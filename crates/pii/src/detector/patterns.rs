//! Regex pattern tables for the PII Detector (C12).
//!
//! Defaults and the legal-domain addition mirror the source service's
//! `_DEFAULT_REGEX_PATTERNS` / `_DEFAULT_LEGAL_REGEX_PATTERNS`. Both are
//! merge targets for operator overrides, not the only source of truth:
//! `PII_REGEX_PATTERNS` / `PII_LEGAL_REGEX_PATTERNS` each take a
//! JSON-encoded `{type: pattern}` map through the Config Resolver and are
//! merged on top of (not in place of) the built-in tables.

use std::collections::HashMap;

use regex::Regex;

use idp_core::config::{ConfigResolver, ResolveContext};
use idp_core::models::{Domain, Entity};

fn default_patterns() -> HashMap<String, String> {
    HashMap::from([
        ("SSN".to_string(), r"\b\d{3}-\d{2}-\d{4}\b".to_string()),
        (
            "CREDIT_CARD".to_string(),
            r"\b(?:\d[ -]*?){13,16}\b".to_string(),
        ),
    ])
}

fn default_legal_patterns() -> HashMap<String, String> {
    HashMap::from([("CASE_NUMBER".to_string(), r"\b\d{2}-\d{5}\b".to_string())])
}

fn compile(patterns: HashMap<String, String>) -> Vec<(String, Regex)> {
    patterns
        .into_iter()
        .filter_map(|(ty, pattern)| match Regex::new(&pattern) {
            Ok(re) => Some((ty, re)),
            Err(e) => {
                tracing::warn!("invalid PII regex pattern for {}: {}", ty, e);
                None
            }
        })
        .collect()
}

fn merge_overrides(base: &mut HashMap<String, String>, json: &str) {
    match serde_json::from_str::<HashMap<String, String>>(json) {
        Ok(overrides) => base.extend(overrides),
        Err(e) => tracing::warn!("invalid regex pattern override JSON: {}", e),
    }
}

/// Compiled regex tables, domain-aware: `matches` always runs the defaults
/// and additionally runs the legal table when `domain == Domain::Legal`.
pub struct RegexPatternSet {
    defaults: Vec<(String, Regex)>,
    legal: Vec<(String, Regex)>,
}

impl RegexPatternSet {
    pub fn from_resolver(resolver: &ConfigResolver, ctx: &ResolveContext) -> Self {
        let mut patterns = default_patterns();
        if let Some(json) = resolver.get_opt("PII_REGEX_PATTERNS", ctx) {
            merge_overrides(&mut patterns, &json);
        }
        let mut legal_patterns = default_legal_patterns();
        if let Some(json) = resolver.get_opt("PII_LEGAL_REGEX_PATTERNS", ctx) {
            merge_overrides(&mut legal_patterns, &json);
        }
        Self {
            defaults: compile(patterns),
            legal: compile(legal_patterns),
        }
    }

    /// Built-in defaults only, no Config Resolver involved. Used by tests
    /// and by callers that don't need operator-supplied overrides.
    pub fn defaults_only() -> Self {
        Self {
            defaults: compile(default_patterns()),
            legal: compile(default_legal_patterns()),
        }
    }

    pub fn matches(&self, text: &str, domain: Domain) -> Vec<Entity> {
        let mut out = Vec::new();
        for (entity_type, re) in &self.defaults {
            push_matches(re, entity_type, text, &mut out);
        }
        if domain == Domain::Legal {
            for (entity_type, re) in &self.legal {
                push_matches(re, entity_type, text, &mut out);
            }
        }
        out
    }
}

fn push_matches(re: &Regex, entity_type: &str, text: &str, out: &mut Vec<Entity>) {
    for m in re.find_iter(text) {
        out.push(Entity {
            text: m.as_str().to_string(),
            entity_type: entity_type.to_string(),
            start: m.start(),
            end: m.end(),
            score: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssn_and_credit_card_match_by_default() {
        let set = RegexPatternSet::defaults_only();
        let found = set.matches("SSN 555-12-3456, card 4111 1111 1111 1111", Domain::Default);
        assert!(found.iter().any(|e| e.entity_type == "SSN" && e.text == "555-12-3456"));
        assert!(found.iter().any(|e| e.entity_type == "CREDIT_CARD"));
    }

    #[test]
    fn case_number_only_merges_for_legal_domain() {
        let set = RegexPatternSet::defaults_only();
        let text = "Filed under case 24-56789.";
        assert!(set.matches(text, Domain::Default).is_empty());
        let legal = set.matches(text, Domain::Legal);
        assert!(legal.iter().any(|e| e.entity_type == "CASE_NUMBER"));
    }

    #[test]
    fn offsets_are_byte_offsets_into_source_text() {
        let set = RegexPatternSet::defaults_only();
        let text = "Call Alice at 555-12-3456";
        let found = set.matches(text, Domain::Default);
        let ssn = found.iter().find(|e| e.entity_type == "SSN").unwrap();
        assert_eq!(&text[ssn.start..ssn.end], "555-12-3456");
    }
}
