//! Processing orchestration.
//!
//! Two strategies share the gateway. The synchronous one runs OCR, tag
//! prediction and LLM analysis inside the upload request and stores a
//! completed document. The asynchronous one stores a queued document, hands
//! the file to the processing service and finishes in
//! [`DokeepService::complete_processing`] when the service reports back.
//!
//! OCR is required: when it fails, everything created for the upload is
//! removed again. Prediction and analysis are optional and degrade.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, error, info, warn};

use super::{DokeepService, OwnerId};
use super::ingestion::{AcceptedUpload, UploadOutcome};
use crate::db::{
    CompletedFields, DocumentId, DocumentStatus, InsertOutcome, NewDocument, models::format_date,
};
use crate::error::{ServiceError, ServiceResult, format_error_chain};
use crate::ingestion::{parse_user_date, resolve_created_date, resolve_summary};
use crate::processing::{AnalysisResult, OcrResult};

/// Out-of-band status report from the processing service
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessingReport {
    /// `processing`, `completed` or `failed`
    pub status: String,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub thumbnail_path: Option<String>,
    #[serde(default)]
    pub extracted_date: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Tags, summary and date candidate from the optional stages
struct Enrichment {
    tags: Vec<String>,
    summary: String,
    extracted_date: String,
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

impl DokeepService {
    /// Prediction then analysis. Failures fall back to the previous stage's
    /// tags with no summary and no date.
    async fn enrich(&self, content: &str) -> Enrichment {
        if !self.config.pipeline.ai_enabled {
            debug!("AI stages disabled, skipping prediction and analysis");
            return Enrichment {
                tags: Vec::new(),
                summary: String::new(),
                extracted_date: String::new(),
            };
        }

        let predicted = match self.backend.predict(content).await {
            Ok(tags) => tags,
            Err(e) => {
                warn!(error = %format_error_chain(&e), "Tag prediction failed, continuing without tags");
                Vec::new()
            }
        };

        match self.backend.analyze(content, &predicted).await {
            Ok(AnalysisResult {
                extracted_date,
                tags,
                summary,
            }) => Enrichment {
                tags,
                summary,
                extracted_date,
            },
            Err(e) => {
                warn!(error = %format_error_chain(&e), "LLM analysis failed, using predicted tags");
                Enrichment {
                    tags: predicted,
                    summary: String::new(),
                    extracted_date: String::new(),
                }
            }
        }
    }

    /// Best-effort removal used on compensation paths
    async fn discard_file(&self, path: &Path) {
        if let Err(e) = self.files.remove(path).await {
            warn!(path = %path.display(), error = %format_error_chain(&e), "Failed to remove file");
        }
    }

    /// The reported thumbnail if it names a file in the thumbnails directory
    /// that is not a stored document. Anything else is dropped.
    async fn accept_thumbnail(&self, reported: &str) -> Option<String> {
        let thumbnail = non_empty(reported)?;

        if !self.files.is_thumbnail(Path::new(thumbnail)).await {
            warn!(path = %thumbnail, "Ignoring thumbnail outside the thumbnails directory");
            return None;
        }

        match self.db.is_document_file(thumbnail) {
            Ok(false) => Some(thumbnail.to_string()),
            Ok(true) => {
                warn!(path = %thumbnail, "Ignoring thumbnail that names a stored document");
                None
            }
            Err(e) => {
                warn!(path = %thumbnail, error = %format_error_chain(&e), "Could not check thumbnail, ignoring it");
                None
            }
        }
    }

    /// Remove a thumbnail the processing service wrote. Only files in the
    /// thumbnails directory that no document references are removed.
    pub(super) async fn discard_thumbnail(&self, thumbnail: &str) {
        let Some(thumbnail) = non_empty(thumbnail) else {
            return;
        };
        let path = Path::new(thumbnail);

        if !self.files.is_thumbnail(path).await {
            debug!(path = %thumbnail, "Not a thumbnail or already gone, not removing");
            return;
        }

        match self.db.is_path_referenced(thumbnail) {
            Ok(false) => self.discard_file(path).await,
            Ok(true) => debug!(path = %thumbnail, "Thumbnail still referenced, not removing"),
            Err(e) => {
                warn!(path = %thumbnail, error = %format_error_chain(&e), "Could not check thumbnail references, not removing");
            }
        }
    }

    fn discard_row(&self, owner: &OwnerId, id: DocumentId) {
        if let Err(e) = self.db.delete_document(owner.as_str(), id) {
            error!(doc_id = %id, error = %format_error_chain(&e), "Failed to remove document row");
        }
    }

    pub(super) async fn ingest_synchronously(
        &self,
        upload: AcceptedUpload,
    ) -> ServiceResult<UploadOutcome> {
        let temp = self.files.write_temp(&upload.content).await?;

        let ocr: OcrResult = match self
            .backend
            .process(&upload.filename, upload.content.clone())
            .await
        {
            Ok(ocr) => ocr,
            Err(e) => {
                error!(
                    owner = %upload.owner,
                    filename = %upload.filename,
                    error = %format_error_chain(&e),
                    "OCR failed, document not saved"
                );
                self.discard_file(&temp).await;
                return Err(ServiceError::IngestionAborted { source: e });
            }
        };

        let enrichment = self.enrich(&ocr.content).await;

        let (created_date, date_source) = resolve_created_date(
            upload.created_date.as_deref(),
            non_empty(&enrichment.extracted_date),
            non_empty(&ocr.extracted_date),
            self.clock.today(),
        );
        let summary = resolve_summary(
            upload.summary.as_deref(),
            Some(enrichment.summary.as_str()),
        );

        let new_doc = NewDocument {
            owner_id: upload.owner.as_str().to_string(),
            title: upload.title.clone(),
            original_filename: upload.filename.clone(),
            file_path: temp.to_string_lossy().to_string(),
            content: Some(ocr.content.clone()),
            thumbnail: self.accept_thumbnail(&ocr.thumbnail_path).await,
            summary,
            file_hash: upload.file_hash.clone(),
            status: DocumentStatus::Completed,
            created_date: Some(created_date),
            created_at: self.clock.now(),
        };

        let id = match self.db.insert_document(&new_doc) {
            Ok(InsertOutcome::Inserted(id)) => id,
            Ok(InsertOutcome::Duplicate) => {
                info!(owner = %upload.owner, hash = %upload.file_hash, "Concurrent duplicate upload rejected");
                self.discard_file(&temp).await;
                self.discard_thumbnail(&ocr.thumbnail_path).await;
                return Ok(UploadOutcome::Duplicate);
            }
            Err(e) => {
                self.discard_file(&temp).await;
                self.discard_thumbnail(&ocr.thumbnail_path).await;
                return Err(e);
            }
        };

        if let Err(e) = self.place_file(id, &temp, &upload.filename).await {
            self.discard_row(&upload.owner, id);
            self.discard_file(&temp).await;
            self.discard_thumbnail(&ocr.thumbnail_path).await;
            return Err(e);
        }

        let tagged = self.attach_tags(id, &enrichment.tags);

        info!(
            doc_id = %id,
            owner = %upload.owner,
            tags = tagged,
            created_date = %created_date,
            date_source = ?date_source,
            "Document uploaded and processed"
        );

        Ok(UploadOutcome::Completed(id))
    }

    pub(super) async fn ingest_asynchronously(
        &self,
        upload: AcceptedUpload,
    ) -> ServiceResult<UploadOutcome> {
        let temp = self.files.write_temp(&upload.content).await?;

        let user_date = upload.created_date.as_deref().and_then(parse_user_date);
        let new_doc = NewDocument {
            owner_id: upload.owner.as_str().to_string(),
            title: upload.title.clone(),
            original_filename: upload.filename.clone(),
            file_path: temp.to_string_lossy().to_string(),
            content: None,
            thumbnail: None,
            summary: resolve_summary(upload.summary.as_deref(), None),
            file_hash: upload.file_hash.clone(),
            status: DocumentStatus::Queued,
            created_date: user_date,
            created_at: self.clock.now(),
        };

        let id = match self.db.insert_document(&new_doc) {
            Ok(InsertOutcome::Inserted(id)) => id,
            Ok(InsertOutcome::Duplicate) => {
                info!(owner = %upload.owner, hash = %upload.file_hash, "Concurrent duplicate upload rejected");
                self.discard_file(&temp).await;
                return Ok(UploadOutcome::Duplicate);
            }
            Err(e) => {
                self.discard_file(&temp).await;
                return Err(e);
            }
        };

        let stored = match self.place_file(id, &temp, &upload.filename).await {
            Ok(stored) => stored,
            Err(e) => {
                self.discard_row(&upload.owner, id);
                self.discard_file(&temp).await;
                return Err(e);
            }
        };

        if let Err(e) = self
            .backend
            .submit(&upload.filename, upload.content, id)
            .await
        {
            error!(
                doc_id = %id,
                error = %format_error_chain(&e),
                "Processing service rejected document, removing it"
            );
            self.discard_row(&upload.owner, id);
            let _lock = self.files.lock_document(id).await;
            self.discard_file(&stored).await;
            return Err(ServiceError::IngestionAborted { source: e });
        }

        info!(doc_id = %id, owner = %upload.owner, "Document queued for processing");
        Ok(UploadOutcome::Queued(id))
    }

    /// Rename the temporary upload to its final name and record the path
    async fn place_file(
        &self,
        id: DocumentId,
        temp: &Path,
        filename: &str,
    ) -> ServiceResult<PathBuf> {
        let stored = self.files.promote(id, temp, filename).await?;

        if let Err(e) = self.db.set_file_path(id, &stored.to_string_lossy()) {
            // Move the file back so the caller's cleanup finds it
            if let Err(rename_err) = tokio::fs::rename(&stored, temp).await {
                warn!(doc_id = %id, error = %rename_err, "Failed to restore temporary upload");
                self.discard_file(&stored).await;
            }
            return Err(e);
        }

        Ok(stored)
    }

    /// Apply a status report from the processing service
    pub async fn complete_processing(
        &self,
        document_id: DocumentId,
        report: ProcessingReport,
    ) -> ServiceResult<()> {
        let invalid_status = || ServiceError::InvalidRequest {
            message: format!("Unknown processing status: {}", report.status),
        };
        let status = DocumentStatus::parse(report.status.trim()).ok_or_else(invalid_status)?;
        if status == DocumentStatus::Queued {
            return Err(invalid_status());
        }

        let doc = self
            .db
            .get_document_by_id(document_id)?
            .ok_or(ServiceError::DocumentNotFound { document_id })?;

        match status {
            DocumentStatus::Processing => {
                self.db
                    .update_status(document_id, status, report.status_message.as_deref())?;
                debug!(doc_id = %document_id, "Document processing started");
            }
            DocumentStatus::Failed => {
                let message = report
                    .status_message
                    .as_deref()
                    .and_then(non_empty)
                    .unwrap_or("Processing failed");
                self.db.update_status(document_id, status, Some(message))?;
                warn!(doc_id = %document_id, message = %message, "Document processing failed");
            }
            DocumentStatus::Completed => {
                let existing_date = doc.created_date.as_ref().map(format_date);
                let (created_date, date_source) = resolve_created_date(
                    existing_date.as_deref(),
                    report.extracted_date.as_deref(),
                    None,
                    self.clock.today(),
                );

                let thumbnail = self
                    .accept_thumbnail(report.thumbnail_path.as_deref().unwrap_or_default())
                    .await;

                let fields = CompletedFields {
                    content: report.text.unwrap_or_default(),
                    thumbnail,
                    summary: resolve_summary(doc.summary.as_deref(), report.summary.as_deref()),
                    created_date,
                };
                self.db.complete_document(document_id, &fields)?;
                let tagged = self.attach_tags(document_id, &report.tags);

                info!(
                    doc_id = %document_id,
                    tags = tagged,
                    created_date = %created_date,
                    date_source = ?date_source,
                    "Document processing completed"
                );
            }
            DocumentStatus::Queued => {}
        }

        Ok(())
    }
}
