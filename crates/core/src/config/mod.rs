//! Config/Secret Resolver (C1).
//!
//! Resolves a named setting through a layered cascade: object tag -> parameter
//! store -> process environment -> built-in default. Each layer is a small
//! resolver function; the chain is built explicitly per call site rather than
//! through global state, so initialization tolerates a missing parameter
//! store by simply omitting that layer.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::IdpError;

/// Context identifying the object a tag lookup applies to.
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    pub bucket: Option<String>,
    pub key: Option<String>,
    pub tags: HashMap<String, String>,
}

/// A single resolution layer. Returns `None` to fall through to the next layer.
pub trait ConfigSource: Send + Sync {
    fn resolve(&self, name: &str, ctx: &ResolveContext) -> Option<String>;
}

/// Object-tag layer: reads from `ResolveContext::tags`, which callers
/// populate from the object store's `getTags` before resolving.
pub struct TagSource;

impl ConfigSource for TagSource {
    fn resolve(&self, name: &str, ctx: &ResolveContext) -> Option<String> {
        ctx.tags.get(name).cloned()
    }
}

/// Parameter-store layer. Optional: constructed only when a parameter-store
/// client is configured, so its absence simply shortens the chain.
pub struct ParamStoreSource {
    prefix: String,
    values: HashMap<String, String>,
}

impl ParamStoreSource {
    pub fn new(prefix: impl Into<String>, values: HashMap<String, String>) -> Self {
        Self {
            prefix: prefix.into(),
            values,
        }
    }
}

impl ConfigSource for ParamStoreSource {
    fn resolve(&self, name: &str, _ctx: &ResolveContext) -> Option<String> {
        let full = format!("{}/{}", self.prefix.trim_end_matches('/'), name);
        self.values.get(&full).cloned()
    }
}

/// Process-environment layer.
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn resolve(&self, name: &str, _ctx: &ResolveContext) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Resolves settings through an ordered chain of sources, caching results
/// for the life of the process. A single-writer/many-reader discipline
/// (`RwLock`) is sufficient since the cache is append-only.
pub struct ConfigResolver {
    sources: Vec<Box<dyn ConfigSource>>,
    cache: RwLock<HashMap<String, String>>,
}

impl ConfigResolver {
    /// Default cascade: tag -> env. Callers that have a parameter store
    /// available should use `with_sources` instead.
    pub fn default_cascade() -> Self {
        Self::with_sources(vec![Box::new(TagSource), Box::new(EnvSource)])
    }

    pub fn with_sources(sources: Vec<Box<dyn ConfigSource>>) -> Self {
        Self {
            sources,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve `name`, returning `default` if no layer produces a value.
    pub fn get_or(&self, name: &str, ctx: &ResolveContext, default: &str) -> String {
        self.get(name, ctx).unwrap_or_else(|| default.to_string())
    }

    /// Resolve `name`, returning `None` if no layer produces a value. For
    /// settings (like a JSON-encoded pattern override map) where "absent"
    /// and "empty string" are different things.
    pub fn get_opt(&self, name: &str, ctx: &ResolveContext) -> Option<String> {
        self.get(name, ctx)
    }

    /// Resolve `name`, failing with `ConfigMissing` if no layer produces a value.
    pub fn require(&self, name: &str, ctx: &ResolveContext) -> Result<String, IdpError> {
        self.get(name, ctx)
            .ok_or_else(|| IdpError::ConfigMissing(name.to_string()))
    }

    fn get(&self, name: &str, ctx: &ResolveContext) -> Option<String> {
        if let Some(cached) = self.cache.read().unwrap().get(name) {
            return Some(cached.clone());
        }
        for source in &self.sources {
            if let Some(value) = source.resolve(name, ctx) {
                self.cache
                    .write()
                    .unwrap()
                    .insert(name.to_string(), value.clone());
                return Some(value);
            }
        }
        None
    }
}

/// Object-store key prefixes, overridable through the [`ConfigResolver`].
/// Mirrors the layout documented in SPEC_FULL.md §6.
#[derive(Debug, Clone)]
pub struct PrefixConfig {
    pub raw: String,
    pub office_docs: String,
    pub pdf_raw: String,
    pub pdf_pages: String,
    pub text_pages: String,
    pub scan_pages: String,
    pub hocr: String,
    pub text_docs: String,
    pub pii: String,
    pub redacted: String,
    pub curated: String,
}

impl Default for PrefixConfig {
    fn default() -> Self {
        Self {
            raw: "raw/".into(),
            office_docs: "office-docs/".into(),
            pdf_raw: "pdf-raw/".into(),
            pdf_pages: "pdf-pages/".into(),
            text_pages: "text-pages/".into(),
            scan_pages: "scan-pages/".into(),
            hocr: "hocr/".into(),
            text_docs: "text-docs/".into(),
            pii: "pii/".into(),
            redacted: "redacted/".into(),
            curated: "curated/".into(),
        }
    }
}

impl PrefixConfig {
    pub fn from_resolver(resolver: &ConfigResolver, ctx: &ResolveContext) -> Self {
        let default = Self::default();
        Self {
            raw: resolver.get_or("RAW_PREFIX", ctx, &default.raw),
            office_docs: resolver.get_or("OFFICE_DOCS_PREFIX", ctx, &default.office_docs),
            pdf_raw: resolver.get_or("PDF_RAW_PREFIX", ctx, &default.pdf_raw),
            pdf_pages: resolver.get_or("PDF_PAGE_PREFIX", ctx, &default.pdf_pages),
            text_pages: resolver.get_or("TEXT_PAGE_PREFIX", ctx, &default.text_pages),
            scan_pages: resolver.get_or("SCAN_PAGE_PREFIX", ctx, &default.scan_pages),
            hocr: resolver.get_or("HOCR_PREFIX", ctx, &default.hocr),
            text_docs: resolver.get_or("TEXT_DOC_PREFIX", ctx, &default.text_docs),
            pii: resolver.get_or("PII_PREFIX", ctx, &default.pii),
            redacted: resolver.get_or("REDACTED_PREFIX", ctx, &default.redacted),
            curated: resolver.get_or("CURATED_PREFIX", ctx, &default.curated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_beats_env() {
        std::env::set_var("IDP_TEST_KNOB", "from-env");
        let resolver = ConfigResolver::default_cascade();
        let mut ctx = ResolveContext::default();
        ctx.tags.insert("IDP_TEST_KNOB".into(), "from-tag".into());
        assert_eq!(
            resolver.get_or("IDP_TEST_KNOB", &ctx, "default"),
            "from-tag"
        );
    }

    #[test]
    fn falls_back_to_default() {
        let resolver = ConfigResolver::default_cascade();
        let ctx = ResolveContext::default();
        assert_eq!(
            resolver.get_or("IDP_NEVER_SET_KNOB", &ctx, "fallback"),
            "fallback"
        );
    }

    #[test]
    fn require_fails_without_default() {
        let resolver = ConfigResolver::default_cascade();
        let ctx = ResolveContext::default();
        assert!(matches!(
            resolver.require("IDP_NEVER_SET_KNOB_2", &ctx),
            Err(IdpError::ConfigMissing(_))
        ));
    }
}
