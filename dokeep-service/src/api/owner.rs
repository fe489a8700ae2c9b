use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::sync::Arc;

use crate::error::{I18nError, ServiceError};
use crate::service::OwnerId;

use super::AppState;

/// Header carrying the authenticated owner, set by the fronting proxy
pub const OWNER_HEADER: &str = "x-owner-id";

/// The owner a request acts for
pub struct Owner(pub OwnerId);

impl FromRequestParts<Arc<AppState>> for Owner {
    type Rejection = I18nError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| state.i18n_error(ServiceError::MissingOwner))?;

        OwnerId::new(raw)
            .map(Owner)
            .map_err(|e| state.i18n_error(e))
    }
}
