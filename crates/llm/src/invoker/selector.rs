//! Health-checked round-robin endpoint selector, grounded on
//! `llm_invocation/backends.py`'s `_HealthCheckedSelector`: cycles through a
//! configured endpoint list, skipping an endpoint only while its failure
//! count is at/above threshold AND its cooldown hasn't elapsed.

use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 1;
pub const DEFAULT_COOLDOWN_SECS: u64 = 60;

struct EndpointState {
    url: String,
    failures: u32,
    last_failure: Option<Instant>,
}

pub struct HealthCheckedSelector {
    endpoints: Mutex<Vec<EndpointState>>,
    cursor: Mutex<usize>,
    threshold: u32,
    cooldown: Duration,
}

impl HealthCheckedSelector {
    pub fn new(endpoints: Vec<String>, threshold: u32, cooldown: Duration) -> Self {
        Self {
            endpoints: Mutex::new(
                endpoints.into_iter().map(|url| EndpointState { url, failures: 0, last_failure: None }).collect(),
            ),
            cursor: Mutex::new(0),
            threshold,
            cooldown,
        }
    }

    pub fn with_defaults(endpoints: Vec<String>) -> Self {
        Self::new(endpoints, DEFAULT_FAILURE_THRESHOLD, Duration::from_secs(DEFAULT_COOLDOWN_SECS))
    }

    /// Returns the next endpoint satisfying `failures < threshold OR cooldown
    /// elapsed`, cycling starting after the last-chosen index. Falls back to
    /// the plain next-in-rotation endpoint if every endpoint is currently
    /// unhealthy, matching the source's unconditional `next(self._cycle)`
    /// after the health-checked scan comes up empty.
    pub fn choose(&self) -> Option<String> {
        let endpoints = self.endpoints.lock().unwrap();
        if endpoints.is_empty() {
            return None;
        }
        let mut cursor = self.cursor.lock().unwrap();
        let start = *cursor;
        let now = Instant::now();

        for offset in 0..endpoints.len() {
            let idx = (start + offset) % endpoints.len();
            let ep = &endpoints[idx];
            let healthy = ep.failures < self.threshold
                || ep.last_failure.map(|t| now.duration_since(t) >= self.cooldown).unwrap_or(true);
            if healthy {
                *cursor = (idx + 1) % endpoints.len();
                return Some(ep.url.clone());
            }
        }

        let idx = start % endpoints.len();
        *cursor = (idx + 1) % endpoints.len();
        Some(endpoints[idx].url.clone())
    }

    pub fn record_success(&self, endpoint: &str) {
        let mut endpoints = self.endpoints.lock().unwrap();
        if let Some(ep) = endpoints.iter_mut().find(|e| e.url == endpoint) {
            ep.failures = 0;
        }
    }

    pub fn record_failure(&self, endpoint: &str) {
        let mut endpoints = self.endpoints.lock().unwrap();
        if let Some(ep) = endpoints.iter_mut().find(|e| e.url == endpoint) {
            ep.failures += 1;
            ep.last_failure = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_through_endpoints_in_order() {
        let selector = HealthCheckedSelector::with_defaults(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(selector.choose().as_deref(), Some("a"));
        assert_eq!(selector.choose().as_deref(), Some("b"));
        assert_eq!(selector.choose().as_deref(), Some("a"));
    }

    #[test]
    fn skips_endpoint_over_failure_threshold_within_cooldown() {
        let selector = HealthCheckedSelector::new(vec!["a".to_string(), "b".to_string()], 1, Duration::from_secs(60));
        selector.record_failure("a");
        assert_eq!(selector.choose().as_deref(), Some("b"));
    }

    #[test]
    fn empty_endpoint_list_returns_none() {
        let selector = HealthCheckedSelector::with_defaults(vec![]);
        assert!(selector.choose().is_none());
    }
}
