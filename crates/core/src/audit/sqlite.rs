//! SQLite-backed `AuditStore`.
//!
//! Uses `rusqlite` directly (rather than Diesel's query builder) because the
//! table has exactly one access pattern — get/insert/update by primary key —
//! and `cetane`'s migrator already requires a raw `rusqlite::Connection` to
//! apply migrations, the same way the corpus's own migration runner does.
//! The connection is wrapped in a blocking mutex and all access goes through
//! `spawn_blocking`, mirroring how the corpus bridges Diesel into async code.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::OptionalExtension;

use super::migrations;
use super::{AuditRecord, AuditStore};
use crate::error::IdpError;
use crate::models::DocumentStatus;

pub struct SqliteAuditStore {
    conn: Arc<Mutex<rusqlite::Connection>>,
}

impl SqliteAuditStore {
    pub fn connect(database_path: &str) -> Result<Self, IdpError> {
        let conn = rusqlite::Connection::open(database_path)
            .map_err(|e| IdpError::BackendUnavailable(e.to_string()))?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self, IdpError> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| IdpError::BackendUnavailable(e.to_string()))?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate(conn: &rusqlite::Connection) -> Result<(), IdpError> {
        use cetane::backend::Sqlite;
        use cetane::migrator::Migrator;

        let mut state = CetaneState::new(conn)?;
        let registry = migrations::registry();
        let backend = Sqlite;
        let mut migrator = Migrator::new(&registry, &backend, &mut state);
        migrator
            .migrate_forward(|sql| conn.execute_batch(sql).map_err(|e| e.to_string()))
            .map_err(|e| IdpError::BackendUnavailable(e.to_string()))?;
        Ok(())
    }
}

struct CetaneState<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> CetaneState<'a> {
    fn new(conn: &'a rusqlite::Connection) -> Result<Self, IdpError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS __cetane_migrations (
                name TEXT PRIMARY KEY NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .map_err(|e| IdpError::BackendUnavailable(e.to_string()))?;
        Ok(Self { conn })
    }
}

impl cetane::migrator::MigrationStateStore for CetaneState<'_> {
    fn applied_migrations(&mut self) -> Result<Vec<String>, String> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM __cetane_migrations ORDER BY name")
            .map_err(|e| e.to_string())?;
        stmt.query_map([], |row| row.get(0))
            .map_err(|e| e.to_string())?
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| e.to_string())
    }

    fn mark_applied(&mut self, name: &str) -> Result<(), String> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO __cetane_migrations (name) VALUES (?1)",
                [name],
            )
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn mark_unapplied(&mut self, name: &str) -> Result<(), String> {
        self.conn
            .execute("DELETE FROM __cetane_migrations WHERE name = ?1", [name])
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn create_if_absent(
        &self,
        document_id: &str,
        initial_status: DocumentStatus,
    ) -> Result<(), IdpError> {
        let conn = self.conn.clone();
        let document_id = document_id.to_string();
        let status = initial_status.as_str().to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT OR IGNORE INTO audit_records \
                 (document_id, status, page_count, info, created_at, updated_at) \
                 VALUES (?1, ?2, NULL, NULL, ?3, ?3)",
                rusqlite::params![document_id, status, now],
            )
            .map_err(|e| IdpError::BackendUnavailable(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| IdpError::Other(e.into()))?
    }

    async fn update(
        &self,
        document_id: &str,
        status: DocumentStatus,
        page_count: Option<u32>,
        info: Option<&str>,
    ) -> Result<(), IdpError> {
        let conn = self.conn.clone();
        let document_id = document_id.to_string();
        let status_str = status.as_str().to_string();
        let info = info.map(|s| s.to_string());
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let now = Utc::now().to_rfc3339();

            // Conditional write: hold the mutex across the read and the
            // write so a stale or re-delivered status can't regress the
            // record past a later one that landed first.
            let current: Option<String> = conn
                .query_row(
                    "SELECT status FROM audit_records WHERE document_id = ?1",
                    [&document_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| IdpError::BackendUnavailable(e.to_string()))?;

            let allowed = match current.as_deref().and_then(DocumentStatus::from_str) {
                Some(current) => current.can_transition_to(status),
                None => true,
            };
            if !allowed {
                return Ok(());
            }

            conn.execute(
                "UPDATE audit_records SET status = ?2, page_count = ?3, info = ?4, updated_at = ?5 \
                 WHERE document_id = ?1",
                rusqlite::params![document_id, status_str, page_count, info, now],
            )
            .map_err(|e| IdpError::BackendUnavailable(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| IdpError::Other(e.into()))?
    }

    async fn get(&self, document_id: &str) -> Result<Option<AuditRecord>, IdpError> {
        let conn = self.conn.clone();
        let document_id = document_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            conn.query_row(
                "SELECT document_id, status, page_count, info FROM audit_records WHERE document_id = ?1",
                [&document_id],
                |row| {
                    Ok(AuditRecord {
                        document_id: row.get(0)?,
                        status: DocumentStatus::from_str(&row.get::<_, String>(1)?)
                            .unwrap_or(DocumentStatus::Failed),
                        page_count: row.get::<_, Option<i64>>(2)?.map(|n| n as u32),
                        info: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(|e| IdpError::BackendUnavailable(e.to_string()))
        })
        .await
        .map_err(|e| IdpError::Other(e.into()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_update_roundtrip() {
        let store = SqliteAuditStore::in_memory().unwrap();
        store
            .create_if_absent("doc-1", DocumentStatus::Uploaded)
            .await
            .unwrap();
        store
            .update("doc-1", DocumentStatus::Split, Some(3), None)
            .await
            .unwrap();
        let record = store.get("doc-1").await.unwrap().unwrap();
        assert_eq!(record.status, DocumentStatus::Split);
        assert_eq!(record.page_count, Some(3));
    }

    #[tokio::test]
    async fn missing_document_returns_none() {
        let store = SqliteAuditStore::in_memory().unwrap();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_update_does_not_regress_status() {
        let store = SqliteAuditStore::in_memory().unwrap();
        store.create_if_absent("doc-1", DocumentStatus::Uploaded).await.unwrap();
        store.update("doc-1", DocumentStatus::Combined, Some(3), None).await.unwrap();

        // A re-delivered SPLIT notification arriving after COMBINED must be dropped.
        store.update("doc-1", DocumentStatus::Split, Some(3), None).await.unwrap();

        let record = store.get("doc-1").await.unwrap().unwrap();
        assert_eq!(record.status, DocumentStatus::Combined);
    }
}
