//! SQLite-backed session repository.
//!
//! Records live in the `sessions` table with the snapshot stored as an
//! opaque JSON blob; title search goes through the `sessions_fts` FTS5 index
//! maintained by triggers (see `migrations`). Any storage failure is
//! surfaced once to the caller, which is expected to fail over to the
//! in-memory repository for the rest of the process.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::OptionalExtension;

use atelier_core::error::{AtelierError, Result};
use atelier_core::snapshot;
use atelier_core::types::{now_millis, SessionRecord, SessionSnapshot};

use crate::db::Database;
use crate::repository::SessionRepository;

/// Durable repository over a shared [`Database`] handle.
pub struct SqliteSessionRepository {
    db: Arc<Database>,
}

impl SqliteSessionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

/// Build an FTS5 query matching titles where any token starts with `term`.
///
/// The term is quoted as a single phrase (embedded quotes doubled) so user
/// input cannot reach the FTS5 query parser as operators.
fn fts_prefix_query(term: &str) -> String {
    format!("\"{}\"*", term.replace('"', "\"\""))
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    async fn list(&self) -> Result<Vec<SessionRecord>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, title, created_at, updated_at FROM sessions
                     ORDER BY created_at DESC",
                )
                .map_err(|e| AtelierError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], row_to_record)
                .map_err(|e| AtelierError::Storage(e.to_string()))?;

            let mut records = Vec::new();
            for row in rows {
                records.push(row.map_err(|e| AtelierError::Storage(e.to_string()))?);
            }
            Ok(records)
        })
    }

    async fn search(&self, term: &str) -> Result<Vec<SessionRecord>> {
        let query = term.trim();
        if query.is_empty() {
            return self.list().await;
        }
        let fts_query = fts_prefix_query(query);

        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, title, created_at, updated_at FROM sessions
                     WHERE rowid IN (
                         SELECT rowid FROM sessions_fts WHERE sessions_fts MATCH ?1
                     )
                     ORDER BY created_at DESC",
                )
                .map_err(|e| AtelierError::Search(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![fts_query], row_to_record)
                .map_err(|e| AtelierError::Search(e.to_string()))?;

            let mut records = Vec::new();
            for row in rows {
                records.push(row.map_err(|e| AtelierError::Search(e.to_string()))?);
            }
            Ok(records)
        })
    }

    async fn load(&self, id: &str) -> Result<Option<(SessionRecord, SessionSnapshot)>> {
        self.db.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, title, created_at, updated_at, snapshot
                     FROM sessions WHERE id = ?1 LIMIT 1",
                    rusqlite::params![id],
                    |row| {
                        let record = row_to_record(row)?;
                        let blob: String = row.get(4)?;
                        Ok((record, blob))
                    },
                )
                .optional()
                .map_err(|e| AtelierError::Storage(e.to_string()))?;

            // Corrupt blobs degrade to an empty snapshot rather than failing
            // the load; the session then simply appears empty.
            Ok(row.map(|(record, blob)| (record, snapshot::decode(&blob))))
        })
    }

    async fn upsert(&self, record: &SessionRecord, snap: &SessionSnapshot) -> Result<()> {
        let blob = snapshot::encode(snap)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, title, created_at, updated_at, snapshot)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                     title = excluded.title,
                     created_at = excluded.created_at,
                     updated_at = excluded.updated_at,
                     snapshot = excluded.snapshot",
                rusqlite::params![
                    record.id,
                    record.title,
                    record.created_at,
                    record.updated_at,
                    blob,
                ],
            )
            .map_err(|e| AtelierError::Storage(format!("Failed to upsert session: {}", e)))?;
            Ok(())
        })
    }

    async fn rename(&self, id: &str, title: &str) -> Result<()> {
        let updated_at = now_millis();
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE sessions SET title = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![title, updated_at, id],
            )
            .map_err(|e| AtelierError::Storage(format!("Failed to rename session: {}", e)))?;
            Ok(())
        })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM sessions WHERE id = ?1", rusqlite::params![id])
                .map_err(|e| AtelierError::Storage(format!("Failed to delete session: {}", e)))?;
            Ok(())
        })
    }
}
