//! Audit Store (C3): per-document status/page-count record with monotone
//! state progression. Backed by SQLite (via rusqlite, migrated with cetane)
//! when a database is configured, degrading to a no-op when it isn't
//! (§4.3: "missing table configuration degrades to a no-op").

mod migrations;
mod sqlite;

pub use sqlite::SqliteAuditStore;

use async_trait::async_trait;

use crate::error::IdpError;
use crate::models::DocumentStatus;

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn create_if_absent(
        &self,
        document_id: &str,
        initial_status: DocumentStatus,
    ) -> Result<(), IdpError>;

    async fn update(
        &self,
        document_id: &str,
        status: DocumentStatus,
        page_count: Option<u32>,
        info: Option<&str>,
    ) -> Result<(), IdpError>;

    async fn get(&self, document_id: &str) -> Result<Option<AuditRecord>, IdpError>;
}

#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub document_id: String,
    pub status: DocumentStatus,
    pub page_count: Option<u32>,
    pub info: Option<String>,
}

/// Best-effort audit backend used when no database is configured.
pub struct NoopAuditStore;

#[async_trait]
impl AuditStore for NoopAuditStore {
    async fn create_if_absent(
        &self,
        _document_id: &str,
        _initial_status: DocumentStatus,
    ) -> Result<(), IdpError> {
        Ok(())
    }

    async fn update(
        &self,
        _document_id: &str,
        _status: DocumentStatus,
        _page_count: Option<u32>,
        _info: Option<&str>,
    ) -> Result<(), IdpError> {
        Ok(())
    }

    async fn get(&self, _document_id: &str) -> Result<Option<AuditRecord>, IdpError> {
        Ok(None)
    }
}
