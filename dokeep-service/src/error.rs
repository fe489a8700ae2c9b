use std::path::PathBuf;
use std::time::Duration;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::DocumentId;
use crate::i18n::I18n;
use crate::processing::Stage;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Document not found: {document_id}")]
    DocumentNotFound { document_id: DocumentId },

    #[error("Tag not found: {tag}")]
    TagNotFound { tag: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Missing owner identity")]
    MissingOwner,

    /// A required stage failed during ingestion; everything created for the
    /// upload has already been removed.
    #[error("Ingestion aborted, document not saved")]
    IngestionAborted {
        #[source]
        source: ExternalServiceError,
    },

    #[error("{0}")]
    ExternalService(#[from] ExternalServiceError),

    #[error("Database error")]
    Database(#[from] DatabaseError),

    #[error("Storage error")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Errors talking to the processing and LLM services
#[derive(Error, Debug)]
pub enum ExternalServiceError {
    #[error("Request to {stage} service at {url} failed")]
    Connection {
        stage: Stage,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{stage} service timed out after {}s", .after.as_secs())]
    Timeout { stage: Stage, after: Duration },

    #[error("{stage} service returned status {status}: {message}")]
    Status {
        stage: Stage,
        status: u16,
        message: String,
    },

    #[error("Invalid response from {stage} service")]
    InvalidResponse {
        stage: Stage,
        #[source]
        source: reqwest::Error,
    },
}

impl ExternalServiceError {
    pub fn stage(&self) -> Stage {
        match self {
            ExternalServiceError::Connection { stage, .. }
            | ExternalServiceError::Timeout { stage, .. }
            | ExternalServiceError::Status { stage, .. }
            | ExternalServiceError::InvalidResponse { stage, .. } => *stage,
        }
    }
}

/// Database errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed")]
    Connection(#[source] rusqlite::Error),

    #[error("Query failed")]
    Query(#[source] rusqlite::Error),

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("Database connection lock poisoned")]
    LockPoisoned,
}

/// Upload storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("File operation failed on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::DocumentNotFound { .. } | ServiceError::TagNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            ServiceError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            ServiceError::MissingOwner => StatusCode::UNAUTHORIZED,
            ServiceError::IngestionAborted { .. } | ServiceError::ExternalService(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ServiceError::DocumentNotFound { .. } => "document_not_found",
            ServiceError::TagNotFound { .. } => "tag_not_found",
            ServiceError::InvalidRequest { .. } => "invalid_request",
            ServiceError::MissingOwner => "missing_owner",
            ServiceError::IngestionAborted { .. } => "ingestion_aborted",
            ServiceError::ExternalService(_) => "external_service_error",
            ServiceError::Database(_) => "database_error",
            ServiceError::Storage(_) => "storage_error",
            ServiceError::Config { .. } => "config_error",
        }
    }

    /// Get a user-friendly translated message
    pub fn user_message(&self, i18n: &I18n, locale: &str) -> String {
        match self {
            ServiceError::DocumentNotFound { document_id } => i18n.format(
                locale,
                "error-document-not-found",
                &[("id", &document_id.to_string())],
            ),
            ServiceError::TagNotFound { tag } => {
                i18n.format(locale, "error-tag-not-found", &[("tag", tag)])
            }
            ServiceError::IngestionAborted { .. } => {
                i18n.get(locale, "error-ingestion-aborted", None)
            }
            ServiceError::ExternalService(e) if e.stage() == Stage::Train => {
                i18n.get(locale, "error-training-failed", None)
            }
            ServiceError::Database(_) | ServiceError::Storage(_) => {
                i18n.get(locale, "error-internal", None)
            }
            // For other errors, fall back to the technical message
            _ => self.to_string(),
        }
    }

    /// Convert to an error response with i18n support
    pub fn into_response_with_i18n(self, i18n: &I18n, locale: &str) -> Response {
        let status = self.status_code();
        let response = ErrorResponse {
            message: self.user_message(i18n, locale),
            code: Some(self.error_code().to_string()),
        };

        (status, Json(response)).into_response()
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let response = ErrorResponse {
            message: self.to_string(),
            code: Some(self.error_code().to_string()),
        };

        (status, Json(response)).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Render an error together with its source chain, for log fields.
pub fn format_error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Error wrapper with i18n support for API responses
pub struct I18nError {
    pub error: ServiceError,
    pub i18n: std::sync::Arc<I18n>,
    pub locale: String,
}

impl I18nError {
    pub fn new(error: ServiceError, i18n: std::sync::Arc<I18n>, locale: impl Into<String>) -> Self {
        Self {
            error,
            i18n,
            locale: locale.into(),
        }
    }
}

impl IntoResponse for I18nError {
    fn into_response(self) -> Response {
        self.error.into_response_with_i18n(&self.i18n, &self.locale)
    }
}
