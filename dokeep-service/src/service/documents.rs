//! Owner edits, lookup and deletion of single documents.

use std::path::Path;

use tracing::{info, warn};

use super::{DokeepService, OwnerId};
use crate::db::{Document, DocumentId};
use crate::error::{ServiceError, ServiceResult, format_error_chain};
use crate::ingestion::parse_user_date;

fn invalid_date(value: &str) -> ServiceError {
    ServiceError::InvalidRequest {
        message: format!("Invalid date format '{}', expected YYYY-MM-DD", value.trim()),
    }
}

impl DokeepService {
    /// One of the owner's documents with its tags
    pub fn show(&self, owner: &OwnerId, document_id: DocumentId) -> ServiceResult<Document> {
        self.db
            .get_document(owner.as_str(), document_id)?
            .ok_or(ServiceError::DocumentNotFound { document_id })
    }

    pub fn update_details(
        &self,
        owner: &OwnerId,
        document_id: DocumentId,
        title: &str,
        summary: &str,
        created_date: &str,
    ) -> ServiceResult<()> {
        let date = parse_user_date(created_date).ok_or_else(|| invalid_date(created_date))?;

        if !self
            .db
            .update_details(owner.as_str(), document_id, title.trim(), summary.trim(), &date)?
        {
            return Err(ServiceError::DocumentNotFound { document_id });
        }

        info!(doc_id = %document_id, owner = %owner, "Document details updated");
        Ok(())
    }

    pub fn update_date(
        &self,
        owner: &OwnerId,
        document_id: DocumentId,
        created_date: &str,
    ) -> ServiceResult<()> {
        let date = parse_user_date(created_date).ok_or_else(|| invalid_date(created_date))?;

        if !self
            .db
            .update_created_date(owner.as_str(), document_id, &date)?
        {
            return Err(ServiceError::DocumentNotFound { document_id });
        }

        Ok(())
    }

    /// Delete one of the owner's documents with its tag links, file and
    /// thumbnail. Only the row deletion can fail the call; later cleanup
    /// failures are logged.
    pub async fn delete(&self, owner: &OwnerId, document_id: DocumentId) -> ServiceResult<()> {
        let doc = self.show(owner, document_id)?;
        let _lock = self.files.lock_document(document_id).await;

        if !self.db.delete_document(owner.as_str(), document_id)? {
            return Err(ServiceError::DocumentNotFound { document_id });
        }

        if let Err(e) = self.db.delete_document_tags(document_id) {
            warn!(doc_id = %document_id, error = %format_error_chain(&e), "Failed to remove tag links");
        }

        if let Err(e) = self.files.remove(Path::new(&doc.file_path)).await {
            warn!(doc_id = %document_id, error = %format_error_chain(&e), "Failed to remove document file");
        }

        if let Some(thumbnail) = doc.thumbnail.as_deref() {
            self.discard_thumbnail(thumbnail).await;
        }

        info!(doc_id = %document_id, owner = %owner, "Document deleted");
        Ok(())
    }
}
