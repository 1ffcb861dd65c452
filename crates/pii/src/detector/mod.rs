//! PII Detector (C12): regex patterns (defaults plus domain-specific
//! additions) unioned with NER-backend entities, domain-switched by the
//! event's `domain` field.

mod ner;
mod patterns;

pub use ner::{NerBackend, NerResult, RegexNerBackend};
pub use patterns::RegexPatternSet;

use idp_core::config::{ConfigResolver, ResolveContext};
use idp_core::models::{Domain, Entity};

/// Unions regex and NER spans for a document. Duplicates across engines
/// are acceptable by design (callers that need to dedupe can do so on
/// `(entity_type, start, end)`); the Redactor downstream dedupes boxes
/// per page regardless of how many entities produced them.
pub struct PiiDetector {
    patterns: RegexPatternSet,
    ner: Box<dyn NerBackend>,
}

impl PiiDetector {
    pub fn new(patterns: RegexPatternSet, ner: Box<dyn NerBackend>) -> Self {
        Self { patterns, ner }
    }

    pub fn from_resolver(resolver: &ConfigResolver, ctx: &ResolveContext) -> Self {
        Self::new(
            RegexPatternSet::from_resolver(resolver, ctx),
            Box::new(RegexNerBackend::new()),
        )
    }

    pub fn detect(&self, text: &str, domain: Domain) -> Vec<Entity> {
        let mut entities = self.patterns.matches(text, domain);
        entities.extend(self.ner.extract(text).entities);
        entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_includes_both_engines() {
        let detector = PiiDetector::new(RegexPatternSet::defaults_only(), Box::new(RegexNerBackend::new()));
        let entities = detector.detect("Director Allen Dulles, SSN 555-12-3456", Domain::Default);
        assert!(entities.iter().any(|e| e.entity_type == "SSN"));
        assert!(entities.iter().any(|e| e.entity_type == "PERSON"));
    }
}
