//! Document CRUD operations.
//!
//! Every owner-facing lookup filters on `owner_id`, so a foreign document
//! behaves exactly like a missing one.

use chrono::NaiveDate;
use rusqlite::{OptionalExtension, params};

use super::Database;
use super::models::{
    CompletedFields, DOCUMENT_COLUMNS, Document, DocumentId, DocumentStatus, NewDocument,
    format_date, format_timestamp,
};
use super::tags::load_tags;
use crate::error::{DatabaseError, ServiceResult};

/// Result of inserting a document row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(DocumentId),
    /// The owner already has a document with this content hash
    Duplicate,
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl Database {
    /// Insert a new document. A (owner, hash) collision is reported as
    /// `Duplicate` rather than an error.
    pub fn insert_document(&self, doc: &NewDocument) -> ServiceResult<InsertOutcome> {
        let conn = self.conn()?;

        let result = conn.execute(
            r#"
            INSERT INTO documents (owner_id, title, original_filename, file_path, content, thumbnail, summary, file_hash, status, created_date, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                doc.owner_id,
                doc.title,
                doc.original_filename,
                doc.file_path,
                doc.content,
                doc.thumbnail,
                doc.summary,
                doc.file_hash,
                doc.status.as_str(),
                doc.created_date.as_ref().map(format_date),
                format_timestamp(&doc.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted(conn.last_insert_rowid())),
            Err(e) if is_unique_violation(&e) => Ok(InsertOutcome::Duplicate),
            Err(e) => Err(DatabaseError::Query(e).into()),
        }
    }

    /// Find the owner's document carrying this content hash
    pub fn find_document_by_hash(
        &self,
        owner_id: &str,
        file_hash: &str,
    ) -> ServiceResult<Option<DocumentId>> {
        let conn = self.conn()?;

        conn.query_row(
            "SELECT id FROM documents WHERE owner_id = ?1 AND file_hash = ?2",
            params![owner_id, file_hash],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| DatabaseError::Query(e).into())
    }

    /// Whether any document, of any owner, is stored at this path
    pub fn is_document_file(&self, path: &str) -> ServiceResult<bool> {
        let conn = self.conn()?;

        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM documents WHERE file_path = ?1)",
            params![path],
            |row| row.get(0),
        )
        .map_err(|e| DatabaseError::Query(e).into())
    }

    /// Whether any document still uses this path as its file or thumbnail
    pub fn is_path_referenced(&self, path: &str) -> ServiceResult<bool> {
        let conn = self.conn()?;

        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM documents WHERE file_path = ?1 OR thumbnail = ?1)",
            params![path],
            |row| row.get(0),
        )
        .map_err(|e| DatabaseError::Query(e).into())
    }

    /// Get one of the owner's documents, with its tags
    pub fn get_document(&self, owner_id: &str, id: DocumentId) -> ServiceResult<Option<Document>> {
        let conn = self.conn()?;

        let doc = conn
            .query_row(
                &format!(
                    "SELECT {} FROM documents d WHERE d.id = ?1 AND d.owner_id = ?2",
                    DOCUMENT_COLUMNS
                ),
                params![id, owner_id],
                |row| Document::from_row(row, vec![]),
            )
            .optional()
            .map_err(DatabaseError::Query)?;

        match doc {
            Some(mut doc) => {
                doc.tags = load_tags(&conn, id)?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    /// Get a document regardless of owner. Used by the processing callback,
    /// which is addressed by id only.
    pub fn get_document_by_id(&self, id: DocumentId) -> ServiceResult<Option<Document>> {
        let conn = self.conn()?;

        let doc = conn
            .query_row(
                &format!("SELECT {} FROM documents d WHERE d.id = ?1", DOCUMENT_COLUMNS),
                params![id],
                |row| Document::from_row(row, vec![]),
            )
            .optional()
            .map_err(DatabaseError::Query)?;

        match doc {
            Some(mut doc) => {
                doc.tags = load_tags(&conn, id)?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    /// Point the row at the file's final location
    pub fn set_file_path(&self, id: DocumentId, file_path: &str) -> ServiceResult<bool> {
        let conn = self.conn()?;

        let rows = conn
            .execute(
                "UPDATE documents SET file_path = ?1 WHERE id = ?2",
                params![file_path, id],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows > 0)
    }

    /// Delete one of the owner's documents. Tag links go with it through the
    /// foreign key cascade.
    pub fn delete_document(&self, owner_id: &str, id: DocumentId) -> ServiceResult<bool> {
        let conn = self.conn()?;

        let rows = conn
            .execute(
                "DELETE FROM documents WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows > 0)
    }

    /// Owner edit of title, summary and business date
    pub fn update_details(
        &self,
        owner_id: &str,
        id: DocumentId,
        title: &str,
        summary: &str,
        created_date: &NaiveDate,
    ) -> ServiceResult<bool> {
        let conn = self.conn()?;

        let rows = conn
            .execute(
                "UPDATE documents SET title = ?1, summary = ?2, created_date = ?3 WHERE id = ?4 AND owner_id = ?5",
                params![title, summary, format_date(created_date), id, owner_id],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows > 0)
    }

    pub fn update_created_date(
        &self,
        owner_id: &str,
        id: DocumentId,
        created_date: &NaiveDate,
    ) -> ServiceResult<bool> {
        let conn = self.conn()?;

        let rows = conn
            .execute(
                "UPDATE documents SET created_date = ?1 WHERE id = ?2 AND owner_id = ?3",
                params![format_date(created_date), id, owner_id],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows > 0)
    }

    /// Update processing status
    pub fn update_status(
        &self,
        id: DocumentId,
        status: DocumentStatus,
        message: Option<&str>,
    ) -> ServiceResult<bool> {
        let conn = self.conn()?;

        let rows = conn
            .execute(
                "UPDATE documents SET status = ?1, status_message = ?2 WHERE id = ?3",
                params![status.as_str(), message, id],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows > 0)
    }

    /// Store the final processing results and mark the document completed
    pub fn complete_document(&self, id: DocumentId, fields: &CompletedFields) -> ServiceResult<bool> {
        let conn = self.conn()?;

        let rows = conn
            .execute(
                r#"
                UPDATE documents
                SET content = ?1, thumbnail = ?2, summary = ?3, created_date = ?4,
                    status = 'completed', status_message = NULL
                WHERE id = ?5
                "#,
                params![
                    fields.content,
                    fields.thumbnail,
                    fields.summary,
                    format_date(&fields.created_date),
                    id,
                ],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows > 0)
    }

    /// (content, tag name) pairs of every tagged document with content.
    /// Spans all owners.
    pub fn training_rows(&self) -> ServiceResult<Vec<(String, String)>> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(
                r#"
                SELECT d.content, t.name
                FROM documents d
                JOIN document_tags dt ON d.id = dt.document_id
                JOIN tags t ON dt.tag_id = t.id
                WHERE d.content IS NOT NULL AND d.content != ''
                ORDER BY d.id, t.name
                "#,
            )
            .map_err(DatabaseError::Query)?;

        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(DatabaseError::Query)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::Query)?;

        Ok(rows)
    }
}
