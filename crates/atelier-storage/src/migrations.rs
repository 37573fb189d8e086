//! Database schema migrations.
//!
//! Applies the sessions table, its full-text title index, and the triggers
//! that keep the index transactionally consistent with the table.

use rusqlite::Connection;
use tracing::info;

use atelier_core::error::AtelierError;

/// Run all pending database migrations.
///
/// Currently implements the initial schema (version 1). Future migrations
/// can be added by checking the current version and applying incremental changes.
pub fn run_migrations(conn: &Connection) -> Result<(), AtelierError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| AtelierError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| AtelierError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: sessions_schema");
    }

    Ok(())
}

/// Version 1: sessions table plus FTS5 title index.
///
/// The sessions_fts triggers are the single write path to the index; every
/// insert, update, and delete on sessions is reflected in the same
/// transaction, so a search can never observe a stale or missing entry.
fn apply_v1(conn: &Connection) -> Result<(), AtelierError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sessions (
            id          TEXT PRIMARY KEY NOT NULL,
            title       TEXT NOT NULL,
            created_at  INTEGER NOT NULL,
            updated_at  INTEGER NOT NULL,
            snapshot    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_created_at
            ON sessions (created_at DESC);

        CREATE VIRTUAL TABLE IF NOT EXISTS sessions_fts USING fts5(
            title,
            content='sessions',
            content_rowid='rowid'
        );

        CREATE TRIGGER IF NOT EXISTS sessions_ai AFTER INSERT ON sessions BEGIN
            INSERT INTO sessions_fts(rowid, title) VALUES (new.rowid, new.title);
        END;

        CREATE TRIGGER IF NOT EXISTS sessions_ad AFTER DELETE ON sessions BEGIN
            INSERT INTO sessions_fts(sessions_fts, rowid, title)
                VALUES ('delete', old.rowid, old.title);
        END;

        CREATE TRIGGER IF NOT EXISTS sessions_au AFTER UPDATE ON sessions BEGIN
            INSERT INTO sessions_fts(sessions_fts, rowid, title)
                VALUES ('delete', old.rowid, old.title);
            INSERT INTO sessions_fts(rowid, title) VALUES (new.rowid, new.title);
        END;

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'sessions_schema');
        ",
    )
    .map_err(|e| AtelierError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
