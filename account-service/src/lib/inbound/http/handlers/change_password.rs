use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::middleware::AuthenticatedIdentity;
use crate::inbound::http::router::AppState;

pub async fn change_password(
    State(state): State<AppState>,
    Extension(AuthenticatedIdentity(identity)): Extension<AuthenticatedIdentity>,
    Json(body): Json<ChangePasswordRequestBody>,
) -> Result<ApiSuccess<PasswordChangedData>, ApiError> {
    state
        .account_service
        .change_password(&identity, &body.old_password, &body.new_password)
        .await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        PasswordChangedData {
            message: "Password changed".to_string(),
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangePasswordRequestBody {
    #[serde(default)]
    old_password: String,
    #[serde(default)]
    new_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordChangedData {
    pub message: String,
}
