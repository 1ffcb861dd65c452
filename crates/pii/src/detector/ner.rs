//! Pluggable NER backend for the PII Detector (C12).
//!
//! `NerBackend` is the seam a spaCy-equivalent or transformer-equivalent
//! model would plug into (the source dispatches between the two via a
//! `NER_LIBRARY` setting); `RegexNerBackend` is the built-in, zero-model
//! backend that ships by default, covering the high-precision case a
//! pattern can reliably catch: multi-word proper names. Other entity types
//! (`ORG`, `LOCATION`, ...) are left to a configured ML backend.

use std::sync::LazyLock;

use regex::Regex;

use idp_core::models::Entity;

pub struct NerResult {
    pub entities: Vec<Entity>,
}

/// A pluggable named-entity recognizer. Swappable the same way the regex
/// and legal pattern tables are: `PiiDetector` holds one `Box<dyn NerBackend>`
/// and calls it alongside the regex pass, unioning both results.
pub trait NerBackend: Send + Sync {
    /// Human-readable backend identifier (e.g. "regex", "spacy", "hf").
    fn backend_id(&self) -> &str;

    /// Extract named entities from text.
    fn extract(&self, text: &str) -> NerResult;
}

/// Regex-based NER backend. High precision on titled and capitalized
/// multi-word names, no external model or runtime dependency.
pub struct RegexNerBackend;

impl RegexNerBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RegexNerBackend {
    fn default() -> Self {
        Self::new()
    }
}

static TITLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:(?:Dr|Mr|Mrs|Ms|Prof|Director|President|Secretary|Senator|Judge|Dr\.|Mr\.|Mrs\.|Ms\.|Prof\.)\s+)([A-Z][a-z]+(?:\s+[A-Z]\.?)?\s+[A-Z][a-z]+)",
    )
    .expect("title pattern should compile")
});

static CAPITALIZED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][a-z]{2,}(?:\s+[A-Z]\.?\s+|\s+)[A-Z][a-z]{2,})\b")
        .expect("capitalized name pattern should compile")
});

/// Phrases that match the capitalized-name shape but aren't people.
static NAME_STOPWORDS: LazyLock<std::collections::HashSet<&'static str>> = LazyLock::new(|| {
    [
        "United States",
        "New York",
        "New Jersey",
        "Los Angeles",
        "San Francisco",
    ]
    .into_iter()
    .collect()
});

impl NerBackend for RegexNerBackend {
    fn backend_id(&self) -> &str {
        "regex"
    }

    fn extract(&self, text: &str) -> NerResult {
        let mut seen = std::collections::HashSet::new();
        let mut entities = Vec::new();

        for cap in TITLE_PATTERN.captures_iter(text) {
            push_person(&cap, text, &mut entities, &mut seen);
        }
        for cap in CAPITALIZED_NAME.captures_iter(text) {
            push_person(&cap, text, &mut entities, &mut seen);
        }

        NerResult { entities }
    }
}

fn push_person(
    cap: &regex::Captures,
    _text: &str,
    entities: &mut Vec<Entity>,
    seen: &mut std::collections::HashSet<(usize, usize)>,
) {
    let Some(m) = cap.get(1) else { return };
    let name = m.as_str().trim();
    if !is_plausible_name(name) || NAME_STOPWORDS.contains(name) {
        return;
    }
    if !seen.insert((m.start(), m.end())) {
        return;
    }
    entities.push(Entity {
        text: name.to_string(),
        entity_type: "PERSON".to_string(),
        start: m.start(),
        end: m.end(),
        score: None,
    });
}

fn is_plausible_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split_whitespace().collect();
    if parts.len() < 2 || parts.len() > 4 {
        return false;
    }
    parts.iter().all(|p| {
        let first = p.chars().next().unwrap_or('a');
        first.is_uppercase() && p.len() >= 2
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_titled_person() {
        let result = RegexNerBackend::new().extract("Director Allen Dulles met the committee.");
        assert!(result
            .entities
            .iter()
            .any(|e| e.entity_type == "PERSON" && e.text == "Allen Dulles"));
    }

    #[test]
    fn extracts_capitalized_name_without_title() {
        let result = RegexNerBackend::new().extract("John Kennedy spoke at the press conference.");
        assert!(result.entities.iter().any(|e| e.text == "John Kennedy"));
    }

    #[test]
    fn filters_stopword_phrases() {
        let result = RegexNerBackend::new().extract("United States policy on trade.");
        assert!(!result.entities.iter().any(|e| e.text == "United States"));
    }

    #[test]
    fn offsets_index_into_the_source_text() {
        let text = "Call Alice at 555-12-3456";
        let result = RegexNerBackend::new().extract(text);
        for e in &result.entities {
            assert_eq!(&text[e.start..e.end], e.text);
        }
    }
}
