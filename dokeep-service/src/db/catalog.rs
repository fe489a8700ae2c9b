//! Catalog queries: filtered, paginated document listing.
//!
//! Filters are built as a list of SQL clauses with bound values. User text
//! never reaches the SQL string itself.

use rusqlite::params_from_iter;
use rusqlite::types::Value;

use super::{Database, UNICODE_LOWER};
use super::models::{DOCUMENT_COLUMNS, Document};
use super::tags::load_tags;
use crate::error::{DatabaseError, ServiceResult};

/// Document attributes free-text search can match against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    Content,
    Summary,
    /// Name of any tag linked to the document
    TagName,
}

impl SearchField {
    pub const ALL: [SearchField; 4] = [
        SearchField::Title,
        SearchField::Content,
        SearchField::Summary,
        SearchField::TagName,
    ];

    fn column(&self) -> &'static str {
        match self {
            SearchField::Title => "d.title",
            SearchField::Content => "d.content",
            SearchField::Summary => "d.summary",
            SearchField::TagName => "t.name",
        }
    }
}

/// AND-combined predicate over `documents d` left-joined with its tags `t`
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl DocumentFilter {
    /// Restrict to one owner's documents
    pub fn for_owner(owner_id: &str) -> Self {
        Self {
            clauses: vec!["d.owner_id = ?".to_string()],
            params: vec![Value::Text(owner_id.to_string())],
        }
    }

    /// Require a case-insensitive substring match in at least one field.
    /// A blank query adds nothing.
    pub fn matching_any(mut self, fields: &[SearchField], query: &str) -> Self {
        let query = query.trim();
        if query.is_empty() || fields.is_empty() {
            return self;
        }

        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        let alternatives: Vec<String> = fields
            .iter()
            .map(|field| {
                self.params.push(Value::Text(pattern.clone()));
                format!("{}({}) LIKE ? ESCAPE '\\'", UNICODE_LOWER, field.column())
            })
            .collect();

        self.clauses.push(format!("({})", alternatives.join(" OR ")));
        self
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            "1 = 1".to_string()
        } else {
            self.clauses.join(" AND ")
        }
    }
}

/// Escape LIKE wildcards so the query matches literally
fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

const FILTER_FROM: &str = "FROM documents d \
     LEFT JOIN document_tags dt ON dt.document_id = d.id \
     LEFT JOIN tags t ON t.id = dt.tag_id";

impl Database {
    /// One page of matching documents (with tags) and the total match count.
    ///
    /// Newest business date first, undated documents last, then newest
    /// ingestion first.
    pub fn search_documents(
        &self,
        filter: &DocumentFilter,
        limit: u64,
        offset: u64,
    ) -> ServiceResult<(Vec<Document>, u64)> {
        let conn = self.conn()?;
        let where_sql = filter.where_sql();

        let total: i64 = conn
            .query_row(
                &format!("SELECT COUNT(DISTINCT d.id) {} WHERE {}", FILTER_FROM, where_sql),
                params_from_iter(filter.params.iter()),
                |row| row.get(0),
            )
            .map_err(DatabaseError::Query)?;

        let sql = format!(
            r#"
            SELECT {columns} FROM documents d
            WHERE d.id IN (SELECT d.id {from} WHERE {where_sql})
            ORDER BY (d.created_date IS NULL), d.created_date DESC, d.created_at DESC, d.id DESC
            LIMIT ? OFFSET ?
            "#,
            columns = DOCUMENT_COLUMNS,
            from = FILTER_FROM,
            where_sql = where_sql,
        );

        let mut params = filter.params.clone();
        params.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        params.push(Value::Integer(i64::try_from(offset).unwrap_or(i64::MAX)));

        let mut stmt = conn.prepare(&sql).map_err(DatabaseError::Query)?;
        let mut docs = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                Document::from_row(row, vec![])
            })
            .map_err(DatabaseError::Query)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::Query)?;

        for doc in &mut docs {
            doc.tags = load_tags(&conn, doc.id)?;
        }

        Ok((docs, total.max(0) as u64))
    }
}
