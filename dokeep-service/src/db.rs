//! Database module for SQLite operations.
//!
//! This module provides the `Database` struct and all database operations
//! organized into submodules by domain.

mod catalog;
mod documents;
mod migrations;
pub mod models;
mod queue;
mod tags;

pub use catalog::{DocumentFilter, SearchField};
pub use documents::InsertOutcome;
pub use models::{
    CompletedFields, Document, DocumentId, DocumentStatus, NewDocument, QueueRow, QueueStats,
};

use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{DatabaseError, ServiceResult, StorageError};

/// Database manager for SQLite operations
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database at the given path
    pub fn open(path: &Path) -> ServiceResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }

        let conn = Connection::open(path).map_err(DatabaseError::Connection)?;
        Self::init(conn)
    }

    /// Open a private in-memory database
    #[cfg(test)]
    pub fn open_in_memory() -> ServiceResult<Self> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::Connection)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> ServiceResult<Self> {
        // WAL for concurrent readers; in-memory databases report "memory" instead
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })
        .map_err(DatabaseError::Query)?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(DatabaseError::Query)?;

        register_functions(&conn)?;
        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection. Callers must not hold the guard across an await.
    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }
}

/// SQL name of the Unicode-aware lowercasing function. SQLite's own `lower`
/// and `LIKE` only fold ASCII.
pub(crate) const UNICODE_LOWER: &str = "unicode_lower";

fn register_functions(conn: &Connection) -> Result<(), DatabaseError> {
    conn.create_scalar_function(
        UNICODE_LOWER,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|s| s.to_lowercase())),
    )
    .map_err(DatabaseError::Query)
}
