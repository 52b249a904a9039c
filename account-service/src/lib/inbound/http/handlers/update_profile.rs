use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::IdentityData;
use crate::account::errors::AccountError;
use crate::account::models::EmailAddress;
use crate::account::models::UpdateProfileCommand;
use crate::inbound::http::middleware::bearer_token;
use crate::inbound::http::router::AppState;

pub async fn update_profile(
    State(state): State<AppState>,
    Path(nickname): Path<String>,
    headers: HeaderMap,
    Json(body): Json<UpdateProfileRequestBody>,
) -> Result<ApiSuccess<IdentityData>, ApiError> {
    let token = bearer_token(&headers)?;

    let identity = state
        .account_service
        .authorize_nickname(token, &nickname)
        .await?;

    let command = body.try_into_command()?;

    let updated = state
        .account_service
        .update_profile(identity, command)
        .await?;

    Ok(ApiSuccess::new(StatusCode::OK, (&updated).into()))
}

/// Absent fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpdateProfileRequestBody {
    email: Option<String>,
    display_name: Option<String>,
    avatar_link: Option<String>,
}

impl UpdateProfileRequestBody {
    fn try_into_command(self) -> Result<UpdateProfileCommand, AccountError> {
        let email = self.email.map(EmailAddress::new).transpose()?;

        Ok(UpdateProfileCommand {
            email,
            display_name: self.display_name,
            avatar_link: self.avatar_link,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_email_is_rejected_before_update() {
        let body = UpdateProfileRequestBody {
            email: Some("not-an-email".to_string()),
            display_name: None,
            avatar_link: None,
        };

        assert!(matches!(
            body.try_into_command(),
            Err(AccountError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_absent_fields_stay_absent() {
        let body = UpdateProfileRequestBody {
            email: None,
            display_name: Some("Ana".to_string()),
            avatar_link: None,
        };

        let command = body.try_into_command().unwrap();
        assert!(command.email.is_none());
        assert_eq!(command.display_name.as_deref(), Some("Ana"));
        assert!(command.avatar_link.is_none());
    }
}
