use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;

use super::ApiError;
use super::ApiSuccess;
use super::IdentityData;
use crate::inbound::http::middleware::AuthenticatedIdentity;
use crate::inbound::http::router::AppState;

/// Identity owning the bearer session.
pub async fn get_current_identity(
    Extension(AuthenticatedIdentity(identity)): Extension<AuthenticatedIdentity>,
) -> Result<ApiSuccess<IdentityData>, ApiError> {
    Ok(ApiSuccess::new(StatusCode::OK, (&identity).into()))
}

pub async fn get_identity_by_nickname(
    State(state): State<AppState>,
    Path(nickname): Path<String>,
) -> Result<ApiSuccess<IdentityData>, ApiError> {
    state
        .account_service
        .get_identity_by_nickname(&nickname)
        .await
        .map_err(ApiError::from)
        .map(|ref identity| ApiSuccess::new(StatusCode::OK, identity.into()))
}
