//! Ingestion gateway: validation, deduplication and strategy dispatch.

use tracing::info;

use super::{DokeepService, OwnerId};
use crate::config::PipelineShape;
use crate::db::DocumentId;
use crate::error::{ServiceError, ServiceResult};
use crate::ingestion::content_hash;

/// An uploaded file with the owner's optional metadata
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content: Vec<u8>,
    /// Blank means "use the filename"
    pub title: String,
    pub summary: Option<String>,
    /// `YYYY-MM-DD`; an unparseable value is ignored
    pub created_date: Option<String>,
}

/// What became of an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Processed and stored in the same request
    Completed(DocumentId),
    /// Stored and handed to the processing service
    Queued(DocumentId),
    /// The owner already has this file; nothing was stored
    Duplicate,
}

impl UploadOutcome {
    /// Message key of the notice shown to the owner
    pub fn notice_key(&self) -> &'static str {
        match self {
            UploadOutcome::Completed(_) => "doc-upload-success",
            UploadOutcome::Queued(_) => "doc-upload-queued",
            UploadOutcome::Duplicate => "doc-upload-duplicate",
        }
    }

    pub fn document_id(&self) -> Option<DocumentId> {
        match self {
            UploadOutcome::Completed(id) | UploadOutcome::Queued(id) => Some(*id),
            UploadOutcome::Duplicate => None,
        }
    }
}

/// An upload that passed validation and deduplication
pub(super) struct AcceptedUpload {
    pub owner: OwnerId,
    pub filename: String,
    pub content: Vec<u8>,
    pub title: String,
    pub summary: Option<String>,
    pub created_date: Option<String>,
    pub file_hash: String,
}

impl DokeepService {
    /// Ingest an upload with the configured pipeline shape
    pub async fn submit(&self, owner: &OwnerId, upload: Upload) -> ServiceResult<UploadOutcome> {
        if upload.content.is_empty() {
            return Err(ServiceError::InvalidRequest {
                message: "No file uploaded".to_string(),
            });
        }

        let filename = upload.filename.trim().to_string();
        if filename.is_empty() {
            return Err(ServiceError::InvalidRequest {
                message: "Uploaded file has no name".to_string(),
            });
        }

        let max_size = self.config.limits.max_upload_size_bytes;
        if upload.content.len() as u64 > max_size {
            return Err(ServiceError::InvalidRequest {
                message: format!(
                    "File too large: {} bytes (max {} bytes)",
                    upload.content.len(),
                    max_size
                ),
            });
        }

        let file_hash = content_hash(&upload.content);
        if let Some(existing) = self.db.find_document_by_hash(owner.as_str(), &file_hash)? {
            info!(
                owner = %owner,
                existing_doc_id = %existing,
                hash = %file_hash,
                "Duplicate upload rejected"
            );
            return Ok(UploadOutcome::Duplicate);
        }

        let title = match upload.title.trim() {
            "" => filename.clone(),
            title => title.to_string(),
        };

        let accepted = AcceptedUpload {
            owner: owner.clone(),
            filename,
            content: upload.content,
            title,
            summary: upload.summary,
            created_date: upload.created_date,
            file_hash,
        };

        match self.config.pipeline.shape {
            PipelineShape::Synchronous => self.ingest_synchronously(accepted).await,
            PipelineShape::Asynchronous => self.ingest_asynchronously(accepted).await,
        }
    }
}
