//! Generative strategy (final cascade stage), grounded on `generative_router.py`'s
//! `GenerativeRouter`: an unconditional fallback to a configured default
//! backend, reached only when every earlier stage abstains.

#[derive(Clone)]
pub struct GenerativeRouter {
    default_backend: String,
}

impl GenerativeRouter {
    pub fn new(default_backend: impl Into<String>) -> Self {
        Self { default_backend: default_backend.into() }
    }

    pub fn route(&self) -> String {
        self.default_backend.clone()
    }
}

impl Default for GenerativeRouter {
    fn default() -> Self {
        Self::new("bedrock")
    }
}
