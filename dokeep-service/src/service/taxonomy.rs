//! Tag taxonomy: normalization, association and removal.

use tracing::{debug, warn};

use super::{DokeepService, OwnerId};
use crate::db::DocumentId;
use crate::error::{ServiceError, ServiceResult};

/// Trim and lowercase a tag name. Blank names yield `None`.
pub fn normalize_tag(name: &str) -> Option<String> {
    let normalized = name.trim().to_lowercase();
    (!normalized.is_empty()).then_some(normalized)
}

impl DokeepService {
    /// Link every usable tag to a document. A failing tag is logged and
    /// skipped; returns how many were linked.
    pub(crate) fn attach_tags(&self, document_id: DocumentId, tags: &[String]) -> usize {
        let mut attached = 0;

        for raw in tags {
            let Some(name) = normalize_tag(raw) else {
                continue;
            };

            let result = self
                .db
                .upsert_tag(&name)
                .and_then(|tag_id| self.db.link_tag(document_id, tag_id));

            match result {
                Ok(()) => attached += 1,
                Err(e) => warn!(
                    doc_id = %document_id,
                    tag = %name,
                    error = %e,
                    "Failed to attach tag, skipping"
                ),
            }
        }

        debug!(doc_id = %document_id, attached, "Attached tags");
        attached
    }

    fn require_owned(&self, owner: &OwnerId, document_id: DocumentId) -> ServiceResult<()> {
        self.db
            .get_document(owner.as_str(), document_id)?
            .map(|_| ())
            .ok_or(ServiceError::DocumentNotFound { document_id })
    }

    /// Add a tag to one of the owner's documents. A blank name does nothing.
    pub fn add_tag(&self, owner: &OwnerId, document_id: DocumentId, name: &str) -> ServiceResult<()> {
        self.require_owned(owner, document_id)?;

        let Some(name) = normalize_tag(name) else {
            return Ok(());
        };

        let tag_id = self.db.upsert_tag(&name)?;
        self.db.link_tag(document_id, tag_id)
    }

    /// Remove a tag from one of the owner's documents
    pub fn remove_tag(
        &self,
        owner: &OwnerId,
        document_id: DocumentId,
        name: &str,
    ) -> ServiceResult<()> {
        self.require_owned(owner, document_id)?;

        let not_found = || ServiceError::TagNotFound {
            tag: name.trim().to_string(),
        };

        let normalized = normalize_tag(name).ok_or_else(not_found)?;
        let tag_id = self.db.find_tag_id(&normalized)?.ok_or_else(not_found)?;

        if !self.db.unlink_tag(document_id, tag_id)? {
            return Err(not_found());
        }
        Ok(())
    }

    /// Tags of one of the owner's documents, sorted by name
    pub fn document_tags(
        &self,
        owner: &OwnerId,
        document_id: DocumentId,
    ) -> ServiceResult<Vec<String>> {
        self.require_owned(owner, document_id)?;
        self.db.tags_for_document(document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineShape;
    use crate::service::UploadOutcome;
    use crate::service::test_support::{Harness, owner, upload, working_backend};

    async fn stored_document(harness: &Harness) -> DocumentId {
        match harness
            .service
            .submit(&owner("alice"), upload("bill.pdf", b"water"))
            .await
            .unwrap()
        {
            UploadOutcome::Completed(id) => id,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_normalize_tag_is_idempotent() {
        for raw in ["  Invoice ", "invoice", "INVOICE"] {
            let once = normalize_tag(raw).unwrap();
            assert_eq!(once, "invoice");
            assert_eq!(normalize_tag(&once).as_deref(), Some("invoice"));
        }
        assert_eq!(normalize_tag(" \t "), None);
    }

    #[tokio::test]
    async fn test_variants_collapse_to_one_tag_row() {
        let harness = Harness::new(PipelineShape::Synchronous, working_backend());
        let alice = owner("alice");
        let id = stored_document(&harness).await;

        for raw in ["  Invoice ", "invoice", "INVOICE"] {
            harness.service.add_tag(&alice, id, raw).unwrap();
        }
        harness.service.add_tag(&alice, id, "   ").unwrap();

        assert_eq!(
            harness.service.document_tags(&alice, id).unwrap(),
            vec!["invoice", "utilities"]
        );
        let first = harness.service.db.find_tag_id("invoice").unwrap();
        assert_eq!(harness.service.db.upsert_tag("invoice").unwrap(), first.unwrap());
    }

    #[tokio::test]
    async fn test_remove_tag_reports_unknown_tags() {
        let harness = Harness::new(PipelineShape::Synchronous, working_backend());
        let alice = owner("alice");
        let id = stored_document(&harness).await;

        harness.service.remove_tag(&alice, id, " UTILITIES ").unwrap();
        assert_eq!(
            harness.service.document_tags(&alice, id).unwrap(),
            vec!["invoice"]
        );

        for missing in ["utilities", "never-created", ""] {
            let err = harness.service.remove_tag(&alice, id, missing).unwrap_err();
            assert!(matches!(err, ServiceError::TagNotFound { .. }), "{missing}");
        }
    }

    #[tokio::test]
    async fn test_foreign_documents_look_missing() {
        let harness = Harness::new(PipelineShape::Synchronous, working_backend());
        let id = stored_document(&harness).await;
        let mallory = owner("mallory");

        assert!(matches!(
            harness.service.add_tag(&mallory, id, "mine"),
            Err(ServiceError::DocumentNotFound { .. })
        ));
        assert!(matches!(
            harness.service.remove_tag(&mallory, id, "invoice"),
            Err(ServiceError::DocumentNotFound { .. })
        ));
        assert_eq!(harness.service.db.find_tag_id("mine").unwrap(), None);
    }
}
