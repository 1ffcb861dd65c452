//! Ephemeral-collection registry and reaper (C17), grounded on
//! `cleanup_ephemeral_lambda.py`: a scan of a registration table for rows
//! whose `expires_at` has passed, dropping the backing collection and then
//! removing the registration. Tolerant of collections already gone.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::info;

use idp_core::error::IdpError;

use super::proxy::VectorStoreProxy;

#[derive(Default)]
pub struct EphemeralRegistry {
    entries: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl EphemeralRegistry {
    pub fn register(&self, collection: &str, expires_at: DateTime<Utc>) {
        self.entries.write().unwrap().insert(collection.to_string(), expires_at);
    }

    pub fn deregister(&self, collection: &str) {
        self.entries.write().unwrap().remove(collection);
    }

    pub fn list_expired(&self, now: DateTime<Utc>) -> Vec<String> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|(_, expires_at)| **expires_at < now)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Periodic sweep over the registry, dropping and deregistering every
/// collection past its expiry. Idempotent: a collection already dropped
/// out-of-band is simply deregistered on the next pass.
pub struct Reaper<'a> {
    proxy: &'a VectorStoreProxy,
}

impl<'a> Reaper<'a> {
    pub fn new(proxy: &'a VectorStoreProxy) -> Self {
        Self { proxy }
    }

    pub async fn reap_once(&self, now: DateTime<Utc>) -> Result<usize, IdpError> {
        let expired = self.proxy.ephemeral.list_expired(now);
        let mut dropped = 0;
        for collection in expired {
            self.proxy.drop_collection(&collection, None).await?;
            self.proxy.ephemeral.deregister(&collection);
            dropped += 1;
        }
        if dropped > 0 {
            info!(dropped, "reaped expired ephemeral collections");
        }
        Ok(dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn list_expired_only_returns_past_entries() {
        let registry = EphemeralRegistry::default();
        let now = Utc::now();
        registry.register("past", now - Duration::seconds(1));
        registry.register("future", now + Duration::seconds(60));
        let expired = registry.list_expired(now);
        assert_eq!(expired, vec!["past".to_string()]);
    }
}
