//! Processing queue reads.

use rusqlite::params;

use super::Database;
use super::models::{QueueRow, QueueStats, parse_timestamp};
use crate::error::{DatabaseError, ServiceResult};

impl Database {
    /// The owner's documents that are not completed, oldest first.
    /// NULL status or filename come back as empty strings.
    pub fn queue_rows(&self, owner_id: &str) -> ServiceResult<Vec<QueueRow>> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, title, COALESCE(original_filename, ''), COALESCE(status, ''),
                       COALESCE(status_message, ''), created_at
                FROM documents
                WHERE owner_id = ?1 AND (status IS NULL OR status != 'completed')
                ORDER BY created_at ASC, id ASC
                "#,
            )
            .map_err(DatabaseError::Query)?;

        let rows = stmt
            .query_map(params![owner_id], |row| {
                let created_at: String = row.get(5)?;
                Ok(QueueRow {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    original_filename: row.get(2)?,
                    status: row.get(3)?,
                    status_message: row.get(4)?,
                    created_at: parse_timestamp(&created_at),
                })
            })
            .map_err(DatabaseError::Query)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::Query)?;

        Ok(rows)
    }

    pub fn queue_stats(&self, owner_id: &str) -> ServiceResult<QueueStats> {
        let conn = self.conn()?;

        conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status IS NULL OR status = 'queued' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'processing' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0)
            FROM documents
            WHERE owner_id = ?1
            "#,
            params![owner_id],
            |row| {
                Ok(QueueStats {
                    waiting: row.get::<_, i64>(0)? as u64,
                    processing: row.get::<_, i64>(1)? as u64,
                    failed: row.get::<_, i64>(2)? as u64,
                })
            },
        )
        .map_err(|e| DatabaseError::Query(e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DocumentId, DocumentStatus, InsertOutcome, NewDocument};
    use chrono::{Duration, TimeZone, Utc};

    fn insert(db: &Database, title: &str, minutes: i64) -> DocumentId {
        let doc = NewDocument {
            owner_id: "alice".to_string(),
            title: title.to_string(),
            original_filename: format!("{}.pdf", title),
            file_path: format!("uploads/{}.pdf", title),
            content: None,
            thumbnail: None,
            summary: None,
            file_hash: title.to_string(),
            status: DocumentStatus::Queued,
            created_date: None,
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
                + Duration::minutes(minutes),
        };
        match db.insert_document(&doc).unwrap() {
            InsertOutcome::Inserted(id) => id,
            InsertOutcome::Duplicate => panic!("unexpected duplicate"),
        }
    }

    #[test]
    fn test_queue_excludes_completed_and_is_oldest_first() {
        let db = Database::open_in_memory().unwrap();
        let second = insert(&db, "second", 5);
        let first = insert(&db, "first", 1);
        let done = insert(&db, "done", 0);
        db.update_status(done, DocumentStatus::Completed, None).unwrap();
        db.update_status(second, DocumentStatus::Failed, Some("bad scan"))
            .unwrap();

        let rows = db.queue_rows("alice").unwrap();
        let ids: Vec<DocumentId> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(rows[1].status, "failed");
        assert_eq!(rows[1].status_message, "bad scan");
        assert_eq!(rows[0].status_message, "");

        assert!(db.queue_rows("bob").unwrap().is_empty());
    }

    #[test]
    fn test_null_status_renders_empty_and_counts_as_waiting() {
        let db = Database::open_in_memory().unwrap();
        let legacy = insert(&db, "legacy", 0);
        let busy = insert(&db, "busy", 1);
        {
            let conn = db.conn().unwrap();
            conn.execute(
                "UPDATE documents SET status = NULL, original_filename = NULL WHERE id = ?1",
                params![legacy],
            )
            .unwrap();
        }
        db.update_status(busy, DocumentStatus::Processing, None)
            .unwrap();

        let rows = db.queue_rows("alice").unwrap();
        assert_eq!(rows[0].id, legacy);
        assert_eq!(rows[0].status, "");
        assert_eq!(rows[0].original_filename, "");

        let stats = db.queue_stats("alice").unwrap();
        assert_eq!(
            stats,
            QueueStats {
                waiting: 1,
                processing: 1,
                failed: 0
            }
        );
    }
}
