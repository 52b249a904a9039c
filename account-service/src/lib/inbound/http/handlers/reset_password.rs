use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::IdentityData;
use crate::inbound::http::router::AppState;

/// Consume a reset ticket. Issuing tickets and delivering their secrets happens out of band.
pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequestBody>,
) -> Result<ApiSuccess<IdentityData>, ApiError> {
    let identity = state
        .account_service
        .consume_reset_ticket(&body.secret, &body.new_password)
        .await?;

    Ok(ApiSuccess::new(StatusCode::OK, (&identity).into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResetPasswordRequestBody {
    #[serde(default)]
    secret: String,
    #[serde(default)]
    new_password: String,
}
