//! HTTP API for the Dokeep service.
//!
//! JSON endpoints under `/api` for:
//! - Upload, listing and search of documents
//! - Document edits, tags and deletion
//! - The processing queue and classifier training
//! - Status reports from the processing service

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    routing::{delete, get, post, put},
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::db::DocumentId;
use crate::error::{I18nError, ServiceError};
use crate::service::DokeepService;

pub mod documents;
mod owner;
pub mod queue;

pub use owner::{OWNER_HEADER, Owner};

use documents::{
    add_tag_handler, delete_document_handler, get_document_handler, list_documents_handler,
    processing_report_handler, remove_tag_handler, update_date_handler, update_details_handler,
    upload_document_handler,
};
use queue::{queue_handler, queue_status_handler, train_handler};

/// Multipart framing and the text fields on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state
pub struct AppState {
    pub service: Arc<DokeepService>,
    pub start_time: Instant,
}

impl AppState {
    /// Create an i18n-aware error from a service error
    pub fn i18n_error(&self, error: ServiceError) -> I18nError {
        I18nError::new(error, self.service.i18n.clone(), "en")
    }

    /// Parse a document id path segment
    pub fn document_id(&self, raw: &str) -> Result<DocumentId, I18nError> {
        raw.trim().parse().map_err(|_| {
            self.i18n_error(ServiceError::InvalidRequest {
                message: format!("Invalid document id: {}", raw),
            })
        })
    }
}

/// Build the API router
pub fn router(service: Arc<DokeepService>) -> Router {
    let max_body_size = usize::try_from(service.config.limits.max_upload_size_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/documents", get(list_documents_handler))
        .route(
            "/documents",
            post(upload_document_handler).layer(DefaultBodyLimit::max(max_body_size)),
        )
        .route("/documents/{id}", get(get_document_handler))
        .route("/documents/{id}", delete(delete_document_handler))
        .route("/documents/{id}/details", put(update_details_handler))
        .route("/documents/{id}/date", put(update_date_handler))
        .route("/documents/{id}/tags", post(add_tag_handler))
        .route("/documents/{id}/tags/{tag}", delete(remove_tag_handler))
        .route(
            "/documents/{id}/processing",
            post(processing_report_handler),
        )
        .route("/train", post(train_handler))
        .route("/queue", get(queue_handler))
        .route("/queue/status", get(queue_status_handler));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
}
