//! Tag and document-tag operations.
//!
//! Names arriving here are already normalized by the taxonomy layer.

use rusqlite::{Connection, OptionalExtension, params};

use super::Database;
use super::models::DocumentId;
use crate::error::{DatabaseError, ServiceResult};

/// Tag names linked to a document, sorted by name
pub(super) fn load_tags(conn: &Connection, document_id: DocumentId) -> ServiceResult<Vec<String>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT t.name FROM tags t
            JOIN document_tags dt ON dt.tag_id = t.id
            WHERE dt.document_id = ?1
            ORDER BY t.name
            "#,
        )
        .map_err(DatabaseError::Query)?;

    let tags = stmt
        .query_map(params![document_id], |row| row.get(0))
        .map_err(DatabaseError::Query)?
        .collect::<Result<Vec<String>, _>>()
        .map_err(DatabaseError::Query)?;

    Ok(tags)
}

impl Database {
    pub fn find_tag_id(&self, name: &str) -> ServiceResult<Option<i64>> {
        let conn = self.conn()?;

        conn.query_row("SELECT id FROM tags WHERE name = ?1", params![name], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| DatabaseError::Query(e).into())
    }

    /// Get the id of a tag, creating it if absent
    pub fn upsert_tag(&self, name: &str) -> ServiceResult<i64> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT OR IGNORE INTO tags (name) VALUES (?1)",
            params![name],
        )
        .map_err(DatabaseError::Query)?;

        conn.query_row("SELECT id FROM tags WHERE name = ?1", params![name], |row| {
            row.get(0)
        })
        .map_err(|e| DatabaseError::Query(e).into())
    }

    /// Link a tag to a document. Linking twice is a no-op.
    pub fn link_tag(&self, document_id: DocumentId, tag_id: i64) -> ServiceResult<()> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT OR IGNORE INTO document_tags (document_id, tag_id) VALUES (?1, ?2)",
            params![document_id, tag_id],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    /// Returns false when the pair was not linked
    pub fn unlink_tag(&self, document_id: DocumentId, tag_id: i64) -> ServiceResult<bool> {
        let conn = self.conn()?;

        let rows = conn
            .execute(
                "DELETE FROM document_tags WHERE document_id = ?1 AND tag_id = ?2",
                params![document_id, tag_id],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows > 0)
    }

    /// Remove every tag link of a document. The tags themselves stay.
    pub fn delete_document_tags(&self, document_id: DocumentId) -> ServiceResult<usize> {
        let conn = self.conn()?;

        conn.execute(
            "DELETE FROM document_tags WHERE document_id = ?1",
            params![document_id],
        )
        .map_err(|e| DatabaseError::Query(e).into())
    }

    pub fn tags_for_document(&self, document_id: DocumentId) -> ServiceResult<Vec<String>> {
        let conn = self.conn()?;
        load_tags(&conn, document_id)
    }
}
