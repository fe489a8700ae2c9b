//! Queue and training endpoints.

use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use crate::db::QueueRow;
use crate::error::I18nError;
use crate::service::QueueView;

use super::{AppState, Owner};

#[derive(Serialize)]
pub struct TrainResponse {
    pub message: String,
    pub samples: usize,
}

/// Pending documents with counts
pub async fn queue_handler(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
) -> Result<Json<QueueView>, I18nError> {
    let view = state
        .service
        .queue(&owner)
        .map_err(|e| state.i18n_error(e))?;
    Ok(Json(view))
}

/// Pending rows only, for polling
pub async fn queue_status_handler(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
) -> Result<Json<Vec<QueueRow>>, I18nError> {
    let rows = state
        .service
        .queue_rows(&owner)
        .map_err(|e| state.i18n_error(e))?;
    Ok(Json(rows))
}

/// Retrain the classifier. Any owner may trigger it; the corpus is global.
pub async fn train_handler(
    State(state): State<Arc<AppState>>,
    Owner(_owner): Owner,
) -> Result<Json<TrainResponse>, I18nError> {
    let samples = state
        .service
        .train()
        .await
        .map_err(|e| state.i18n_error(e))?;

    Ok(Json(TrainResponse {
        message: state.service.i18n.get("en", "train-started", None),
        samples,
    }))
}
