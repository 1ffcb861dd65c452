//! Heuristic strategy (first cascade stage), grounded on `heuristic_router.py`'s
//! `HeuristicRouter`: an ordered rule list, first matching rule wins, abstaining
//! if none match so the cascade can fall through to later stages. `regex` and
//! `length` rule types are carried over; the source's `language` and
//! `llm_classifier` rule types are dropped (the former needs a
//! language-detection crate absent from this workspace's stack, the latter
//! duplicates the Predictive stage that already follows this one in the
//! cascade).

use regex::Regex;

#[derive(Debug, Clone)]
pub enum Rule {
    Regex { pattern: String, model: String },
    Length { operator: LengthOp, value: usize, unit: LengthUnit, model: String },
}

#[derive(Debug, Clone, Copy)]
pub enum LengthOp {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
}

#[derive(Debug, Clone, Copy)]
pub enum LengthUnit {
    Words,
    Chars,
}

#[derive(Clone)]
pub struct HeuristicRouter {
    rules: Vec<Rule>,
}

impl HeuristicRouter {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// The default configuration the source falls back to when
    /// `HEURISTIC_ROUTER_CONFIG` is unset: a single length rule routing
    /// prompts at or above the complexity threshold to the strong backend.
    pub fn with_default_rules(complexity_threshold: usize) -> Self {
        Self::new(vec![Rule::Length {
            operator: LengthOp::Ge,
            value: complexity_threshold,
            unit: LengthUnit::Words,
            model: "bedrock".to_string(),
        }])
    }

    fn length_of(prompt: &str, unit: LengthUnit) -> usize {
        match unit {
            LengthUnit::Words => prompt.split_whitespace().count(),
            LengthUnit::Chars => prompt.chars().count(),
        }
    }

    /// Returns `Some((backend, trace))` for the first matching rule, or
    /// `None` (abstain) if no rule matches — the cascade then falls through
    /// to the Predictive stage, rather than the source's own quirk of
    /// substituting a `default_route` that keeps the cascade from ever
    /// reaching its later stages.
    pub fn try_route(&self, prompt: &str) -> Option<(String, Vec<String>)> {
        let mut trace = Vec::new();
        for (i, rule) in self.rules.iter().enumerate() {
            trace.push(format!("Evaluating rule #{}", i + 1));
            let matched = match rule {
                Rule::Regex { pattern, model } => match Regex::new(pattern) {
                    Ok(re) if re.is_match(prompt) => Some(model.clone()),
                    Ok(_) => None,
                    Err(e) => {
                        trace.push(format!("  - ERROR in regex rule: {e}"));
                        None
                    }
                },
                Rule::Length { operator, value, unit, model } => {
                    let length = Self::length_of(prompt, *unit);
                    let matched = match operator {
                        LengthOp::Gt => length > *value,
                        LengthOp::Ge => length >= *value,
                        LengthOp::Lt => length < *value,
                        LengthOp::Le => length <= *value,
                        LengthOp::Eq => length == *value,
                    };
                    trace.push(format!("  - length check: {length} vs {value}: {matched}"));
                    matched.then(|| model.clone())
                }
            };
            if let Some(model) = matched {
                trace.push(format!("Rule matched, routing to '{model}'."));
                return Some((model, trace));
            }
        }
        trace.push("No rules matched; abstaining.".to_string());
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_route_long_prompts_to_bedrock() {
        let router = HeuristicRouter::with_default_rules(3);
        let (backend, _) = router.try_route("one two three four five").unwrap();
        assert_eq!(backend, "bedrock");
    }

    #[test]
    fn short_prompts_abstain() {
        let router = HeuristicRouter::with_default_rules(20);
        assert!(router.try_route("hi there").is_none());
    }
}
