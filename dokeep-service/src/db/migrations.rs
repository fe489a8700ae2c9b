//! Database schema migrations.

use rusqlite::Connection;

use crate::error::{DatabaseError, ServiceResult};

/// Create the schema if it does not exist yet.
///
/// `documents.status` is nullable on purpose: rows written by older tooling
/// may lack it, and readers treat NULL as "not completed".
pub(super) fn run_migrations(conn: &Connection) -> ServiceResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id TEXT NOT NULL,
            title TEXT NOT NULL,
            original_filename TEXT,
            file_path TEXT NOT NULL,
            content TEXT,
            thumbnail TEXT,
            summary TEXT,
            file_hash TEXT,
            status TEXT DEFAULT 'queued',
            status_message TEXT,
            created_date TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (owner_id, file_hash)
        );

        CREATE INDEX IF NOT EXISTS idx_documents_owner_created
            ON documents(owner_id, created_date, created_at);
        CREATE INDEX IF NOT EXISTS idx_documents_owner_status
            ON documents(owner_id, status);

        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS document_tags (
            document_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            PRIMARY KEY (document_id, tag_id),
            FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_document_tags_tag ON document_tags(tag_id);
    "#,
    )
    .map_err(|e| DatabaseError::Migration {
        message: e.to_string(),
    })?;

    Ok(())
}
