//! Database model structs.
//!
//! This module contains the data structures for database records.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Store-assigned document identifier
pub type DocumentId = i64;

/// Calendar form used for `created_date` columns
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// Processing state of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Stored, waiting for the processing service
    Queued,
    /// The processing service has picked the document up
    Processing,
    /// Content, tags and summary are final
    Completed,
    /// Processing failed; `status_message` says why
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Queued => "queued",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(DocumentStatus::Queued),
            "processing" => Some(DocumentStatus::Processing),
            "completed" => Some(DocumentStatus::Completed),
            "failed" => Some(DocumentStatus::Failed),
            _ => None,
        }
    }
}

/// Document record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub owner_id: String,
    pub title: String,
    pub original_filename: Option<String>,
    pub file_path: String,
    pub content: Option<String>,
    pub thumbnail: Option<String>,
    pub summary: Option<String>,
    pub file_hash: Option<String>,
    pub status: Option<DocumentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    /// Business date of the document (when it was written, not uploaded)
    pub created_date: Option<NaiveDate>,
    /// Ingestion timestamp
    pub created_at: DateTime<Utc>,
    pub tags: Vec<String>,
}

/// Column list matching `Document::from_row`
pub(crate) const DOCUMENT_COLUMNS: &str = "d.id, d.owner_id, d.title, d.original_filename, \
     d.file_path, d.content, d.thumbnail, d.summary, d.file_hash, d.status, d.status_message, \
     d.created_date, d.created_at";

impl Document {
    pub(crate) fn from_row(row: &Row<'_>, tags: Vec<String>) -> Result<Self, rusqlite::Error> {
        let status: Option<String> = row.get(9)?;
        let created_date: Option<String> = row.get(11)?;
        let created_at: String = row.get(12)?;

        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            title: row.get(2)?,
            original_filename: row.get(3)?,
            file_path: row.get(4)?,
            content: row.get(5)?,
            thumbnail: row.get(6)?,
            summary: row.get(7)?,
            file_hash: row.get(8)?,
            status: status.as_deref().and_then(DocumentStatus::parse),
            status_message: row.get(10)?,
            created_date: created_date
                .as_deref()
                .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok()),
            created_at: parse_timestamp(&created_at),
            tags,
        })
    }
}

/// Values for a new document row
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub owner_id: String,
    pub title: String,
    pub original_filename: String,
    pub file_path: String,
    pub content: Option<String>,
    pub thumbnail: Option<String>,
    pub summary: Option<String>,
    pub file_hash: String,
    pub status: DocumentStatus,
    pub created_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Final fields written when processing completes
#[derive(Debug, Clone)]
pub struct CompletedFields {
    pub content: String,
    pub thumbnail: Option<String>,
    pub summary: Option<String>,
    pub created_date: NaiveDate,
}

/// One line of the processing queue. Missing values are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueRow {
    pub id: DocumentId,
    pub title: String,
    pub original_filename: String,
    pub status: String,
    pub status_message: String,
    pub created_at: DateTime<Utc>,
}

/// Per-owner counts of documents that are not completed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Queued, or without any status
    pub waiting: u64,
    pub processing: u64,
    pub failed: u64,
}

/// Fixed-width RFC 3339 so that text ordering equals time ordering
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub(crate) fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [
            DocumentStatus::Queued,
            DocumentStatus::Processing,
            DocumentStatus::Completed,
            DocumentStatus::Failed,
        ] {
            assert_eq!(DocumentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DocumentStatus::parse("done"), None);
    }

    #[test]
    fn test_timestamps_sort_lexically() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap();
        let later = earlier + chrono::Duration::milliseconds(1);

        assert!(format_timestamp(&earlier) < format_timestamp(&later));
        assert_eq!(parse_timestamp(&format_timestamp(&later)), later);
    }
}
