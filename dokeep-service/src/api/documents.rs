//! Document API endpoints.
//!
//! Handlers for upload, listing, edits, tags and deletion, plus the status
//! callback used by the processing service.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::{Document, DocumentId};
use crate::error::{I18nError, ServiceError};
use crate::service::{CatalogPage, CatalogQuery, ProcessingReport, Upload, UploadOutcome};

use super::{AppState, Owner};

/// List documents query parameters
#[derive(Deserialize)]
pub struct ListDocumentsParams {
    pub q: Option<String>,
    pub page: Option<String>,
}

/// Response for an upload
#[derive(Serialize)]
pub struct UploadResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<DocumentId>,
    pub status: String,
    pub message: String,
}

/// Response for delete operations
#[derive(Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// Request to update title, summary and date together
#[derive(Deserialize)]
pub struct UpdateDetailsRequest {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub created_date: String,
}

#[derive(Deserialize)]
pub struct UpdateDateRequest {
    pub created_date: String,
}

#[derive(Deserialize)]
pub struct AddTagRequest {
    pub name: String,
}

/// Tags of a document after a tag edit
#[derive(Serialize)]
pub struct TagsResponse {
    pub tags: Vec<String>,
}

/// List the owner's documents, optionally filtered by a search query
pub async fn list_documents_handler(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Query(params): Query<ListDocumentsParams>,
) -> Result<Json<CatalogPage>, I18nError> {
    let query = CatalogQuery::new(params.q.as_deref(), params.page.as_deref());
    let page = state
        .service
        .list_documents(&owner, &query)
        .map_err(|e| state.i18n_error(e))?;
    Ok(Json(page))
}

fn multipart_error(state: &AppState, error: impl std::fmt::Display) -> I18nError {
    state.i18n_error(ServiceError::InvalidRequest {
        message: error.to_string(),
    })
}

/// Upload a new document
pub async fn upload_document_handler(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), I18nError> {
    let mut file_data: Option<(Vec<u8>, String)> = None;
    let mut title = String::new();
    let mut summary: Option<String> = None;
    let mut created_date: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&state, e))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field.bytes().await.map_err(|e| multipart_error(&state, e))?;
                file_data = Some((data.to_vec(), filename));
            }
            "title" => {
                title = field.text().await.map_err(|e| multipart_error(&state, e))?;
            }
            "summary" => {
                summary = Some(field.text().await.map_err(|e| multipart_error(&state, e))?);
            }
            "created_date" => {
                created_date = Some(field.text().await.map_err(|e| multipart_error(&state, e))?);
            }
            _ => {}
        }
    }

    let (content, filename) = file_data.ok_or_else(|| {
        state.i18n_error(ServiceError::InvalidRequest {
            message: "No file uploaded".to_string(),
        })
    })?;

    let outcome = state
        .service
        .submit(
            &owner,
            Upload {
                filename,
                content,
                title,
                summary,
                created_date,
            },
        )
        .await
        .map_err(|e| state.i18n_error(e))?;

    let (status_code, status) = match outcome {
        UploadOutcome::Completed(_) => (StatusCode::CREATED, "completed"),
        UploadOutcome::Queued(_) => (StatusCode::CREATED, "queued"),
        UploadOutcome::Duplicate => (StatusCode::CONFLICT, "duplicate"),
    };

    Ok((
        status_code,
        Json(UploadResponse {
            document_id: outcome.document_id(),
            status: status.to_string(),
            message: state.service.i18n.get("en", outcome.notice_key(), None),
        }),
    ))
}

/// Get one of the owner's documents
pub async fn get_document_handler(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<Document>, I18nError> {
    let document_id = state.document_id(&id)?;
    let doc = state
        .service
        .show(&owner, document_id)
        .map_err(|e| state.i18n_error(e))?;
    Ok(Json(doc))
}

pub async fn update_details_handler(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    Json(request): Json<UpdateDetailsRequest>,
) -> Result<Json<Document>, I18nError> {
    let document_id = state.document_id(&id)?;
    let service = &state.service;

    service
        .update_details(
            &owner,
            document_id,
            &request.title,
            &request.summary,
            &request.created_date,
        )
        .and_then(|()| service.show(&owner, document_id))
        .map(Json)
        .map_err(|e| state.i18n_error(e))
}

pub async fn update_date_handler(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    Json(request): Json<UpdateDateRequest>,
) -> Result<Json<Document>, I18nError> {
    let document_id = state.document_id(&id)?;
    let service = &state.service;

    service
        .update_date(&owner, document_id, &request.created_date)
        .and_then(|()| service.show(&owner, document_id))
        .map(Json)
        .map_err(|e| state.i18n_error(e))
}

/// Delete a document with its file, thumbnail and tag links
pub async fn delete_document_handler(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, I18nError> {
    let document_id = state.document_id(&id)?;
    state
        .service
        .delete(&owner, document_id)
        .await
        .map_err(|e| state.i18n_error(e))?;

    Ok(Json(DeleteResponse {
        success: true,
        message: state.service.i18n.get("en", "doc-delete-success", None),
    }))
}

pub async fn add_tag_handler(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    Json(request): Json<AddTagRequest>,
) -> Result<Json<TagsResponse>, I18nError> {
    let document_id = state.document_id(&id)?;
    let service = &state.service;

    service
        .add_tag(&owner, document_id, &request.name)
        .and_then(|()| service.document_tags(&owner, document_id))
        .map(|tags| Json(TagsResponse { tags }))
        .map_err(|e| state.i18n_error(e))
}

pub async fn remove_tag_handler(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path((id, tag)): Path<(String, String)>,
) -> Result<Json<TagsResponse>, I18nError> {
    let document_id = state.document_id(&id)?;
    let service = &state.service;

    service
        .remove_tag(&owner, document_id, &tag)
        .and_then(|()| service.document_tags(&owner, document_id))
        .map(|tags| Json(TagsResponse { tags }))
        .map_err(|e| state.i18n_error(e))
}

/// Status callback from the processing service. Not owner-scoped: the
/// document id alone identifies the work item.
pub async fn processing_report_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(report): Json<ProcessingReport>,
) -> Result<StatusCode, I18nError> {
    let document_id = state.document_id(&id)?;
    state
        .service
        .complete_processing(document_id, report)
        .await
        .map_err(|e| state.i18n_error(e))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{OWNER_HEADER, router};
    use crate::config::PipelineShape;
    use crate::service::DokeepService;
    use crate::service::test_support::{Harness, owner, upload, working_backend};
    use axum::body::Body;
    use axum::http::{Request, header};
    use axum::Router;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app(harness: &Harness) -> Router {
        router(Arc::new(DokeepService::with_parts(
            (*harness.service.config).clone(),
            harness.service.db.clone(),
            harness.service.files.clone(),
            harness.service.backend.clone(),
            harness.service.clock.clone(),
        )))
    }

    fn json_request(method: &str, uri: &str, owner: Option<&str>, body: Value) -> Request<Body> {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(owner) = owner {
            request = request.header(OWNER_HEADER, owner);
        }
        request.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn stored(harness: &Harness, owner_id: &str, name: &str) -> DocumentId {
        harness
            .service
            .submit(&owner(owner_id), upload(name, name.as_bytes()))
            .await
            .unwrap()
            .document_id()
            .unwrap()
    }

    #[tokio::test]
    async fn test_update_details_returns_document() {
        let harness = Harness::new(PipelineShape::Synchronous, working_backend());
        let id = stored(&harness, "alice", "lease.pdf").await;

        let response = app(&harness)
            .oneshot(json_request(
                "PUT",
                &format!("/api/documents/{}/details", id),
                Some("alice"),
                json!({"title": "Lease", "summary": "Flat", "created_date": "2024-01-05"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let doc = json_body(response).await;
        assert_eq!(doc["title"], "Lease");
        assert_eq!(doc["created_date"], "2024-01-05");
    }

    #[tokio::test]
    async fn test_invalid_date_is_bad_request() {
        let harness = Harness::new(PipelineShape::Synchronous, working_backend());
        let id = stored(&harness, "alice", "lease.pdf").await;

        let response = app(&harness)
            .oneshot(json_request(
                "PUT",
                &format!("/api/documents/{}/date", id),
                Some("alice"),
                json!({"created_date": "not a date"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_tag_edits_return_current_tags() {
        let harness = Harness::new(PipelineShape::Synchronous, working_backend());
        let id = stored(&harness, "alice", "bill.pdf").await;
        let app = app(&harness);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/documents/{}/tags", id),
                Some("alice"),
                json!({"name": " Water "}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["tags"],
            json!(["invoice", "utilities", "water"])
        );

        let response = app
            .clone()
            .oneshot(json_request(
                "DELETE",
                &format!("/api/documents/{}/tags/invoice", id),
                Some("alice"),
                Value::Null,
            ))
            .await
            .unwrap();
        assert_eq!(
            json_body(response).await["tags"],
            json!(["utilities", "water"])
        );

        let response = app
            .oneshot(json_request(
                "DELETE",
                &format!("/api/documents/{}/tags/missing", id),
                Some("alice"),
                Value::Null,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["code"], "tag_not_found");
        assert_eq!(body["message"], "Tag not found: missing");
    }

    #[tokio::test]
    async fn test_delete_is_owner_scoped() {
        let harness = Harness::new(PipelineShape::Synchronous, working_backend());
        let id = stored(&harness, "alice", "bill.pdf").await;
        let app = app(&harness);
        let uri = format!("/api/documents/{}", id);

        let response = app
            .clone()
            .oneshot(json_request("DELETE", &uri, Some("bob"), Value::Null))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(json_request("DELETE", &uri, Some("alice"), Value::Null))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["message"],
            "Document deleted successfully"
        );
        assert!(harness.stored_files().is_empty());
    }

    #[tokio::test]
    async fn test_processing_report_completes_queued_document() {
        let harness = Harness::new(PipelineShape::Asynchronous, working_backend());
        let id = stored(&harness, "alice", "scan.pdf").await;
        let app = app(&harness);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/documents/{}/processing", id),
                None,
                json!({
                    "status": "completed",
                    "text": "Scanned receipt",
                    "extracted_date": "2021-07-04",
                    "tags": ["Receipt"]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let doc = harness.service.show(&owner("alice"), id).unwrap();
        assert_eq!(doc.content.as_deref(), Some("Scanned receipt"));
        assert_eq!(doc.tags, vec!["receipt"]);

        let response = app
            .oneshot(json_request(
                "POST",
                &format!("/api/documents/{}/processing", id),
                None,
                json!({"status": "exploded"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
