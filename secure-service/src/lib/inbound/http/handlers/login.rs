use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::SessionData;
use crate::domain::user::models::LoginCommand;
use crate::inbound::http::router::AppState;
use crate::inbound::http::strict_json::StrictJson;

pub async fn login(
    State(state): State<AppState>,
    StrictJson(body, _): StrictJson<LoginRequest>,
) -> Result<ApiSuccess<SessionData>, ApiError> {
    state
        .user_service
        .login(body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|ref session| ApiSuccess::new(StatusCode::OK, session.into()))
}

/// HTTP request body for login (raw JSON)
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

impl LoginRequest {
    fn try_into_command(self) -> Result<LoginCommand, ApiError> {
        let command = LoginCommand::new(&self.email, self.password);

        if command.email.is_empty() {
            return Err(ApiError::BadRequest("email is required".to_string()));
        }
        if command.password.trim().is_empty() {
            return Err(ApiError::BadRequest("password is required".to_string()));
        }

        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_validation() {
        let missing_email = LoginRequest {
            email: "  ".to_string(),
            password: "secret1".to_string(),
        };
        assert_eq!(
            missing_email.try_into_command().unwrap_err(),
            ApiError::BadRequest("email is required".to_string())
        );

        let missing_password = LoginRequest {
            email: "a@b.com".to_string(),
            password: " ".to_string(),
        };
        assert_eq!(
            missing_password.try_into_command().unwrap_err(),
            ApiError::BadRequest("password is required".to_string())
        );

        let ok = LoginRequest {
            email: " A@b.com".to_string(),
            password: "secret1".to_string(),
        };
        assert_eq!(ok.try_into_command().unwrap().email, "a@b.com");
    }
}
