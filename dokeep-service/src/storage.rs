//! Upload storage.
//!
//! Files live flat under a single uploads root. A new upload is written
//! under a temporary name first and renamed once its document row exists,
//! so the final name can carry the document id. The processing service
//! writes thumbnails to the `thumbnails/` subdirectory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

use crate::db::DocumentId;
use crate::error::StorageError;

/// Replace characters that are unsafe in a filename and drop any directory
/// part the client sent along.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();

    let sanitized: String = base
        .chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            ' ' => '-',
            _ => c,
        })
        .collect();

    match sanitized.trim_start_matches('.') {
        "" => "upload".to_string(),
        rest => rest.to_string(),
    }
}

/// Subdirectory of the root holding thumbnails
pub const THUMBNAIL_DIR: &str = "thumbnails";

/// Owns the uploads root and sequences file operations per document
pub struct FileStore {
    root: PathBuf,
    locks: DashMap<DocumentId, Arc<Mutex<()>>>,
}

/// Exclusive access to one document's files. Released on drop.
pub struct DocumentLock<'a> {
    store: &'a FileStore,
    id: DocumentId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for DocumentLock<'_> {
    fn drop(&mut self) {
        // Release before pruning so the entry's only holder is the map
        self.guard.take();
        self.store
            .locks
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl FileStore {
    /// Open the store, creating the root if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| StorageError::io(&root, e))?;

        Ok(Self {
            root,
            locks: DashMap::new(),
        })
    }

    /// Wait for exclusive access to a document's files
    pub async fn lock_document(&self, id: DocumentId) -> DocumentLock<'_> {
        // Clone the Arc out so no map shard stays locked across the await
        let lock = self.locks.entry(id).or_default().clone();
        let guard = lock.lock_owned().await;

        DocumentLock {
            store: self,
            id,
            guard: Some(guard),
        }
    }

    /// Write an upload under a fresh temporary name
    pub async fn write_temp(&self, content: &[u8]) -> Result<PathBuf, StorageError> {
        let path = self.root.join(format!("upload-{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| StorageError::io(&path, e))?;

        debug!(path = %path.display(), size = content.len(), "Wrote temporary upload");
        Ok(path)
    }

    /// Rename a temporary upload to its final `<id>-<name>` form
    pub async fn promote(
        &self,
        id: DocumentId,
        temp: &Path,
        original_name: &str,
    ) -> Result<PathBuf, StorageError> {
        let _lock = self.lock_document(id).await;

        let target = self
            .root
            .join(format!("{}-{}", id, sanitize_filename(original_name)));
        tokio::fs::rename(temp, &target)
            .await
            .map_err(|e| StorageError::io(temp, e))?;

        Ok(target)
    }

    /// Remove a file. A file that is already gone counts as removed.
    pub async fn remove(&self, path: &Path) -> Result<(), StorageError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    /// Whether an existing path resolves to a file inside the thumbnails
    /// directory. Stored documents live directly under the root and never
    /// qualify.
    pub async fn is_thumbnail(&self, path: &Path) -> bool {
        let (dir, target) = tokio::join!(
            tokio::fs::canonicalize(self.root.join(THUMBNAIL_DIR)),
            tokio::fs::canonicalize(path)
        );

        match (dir, target) {
            (Ok(dir), Ok(target)) => target != dir && target.starts_with(dir),
            _ => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_locks(&self) -> usize {
        self.locks.len()
    }
}
