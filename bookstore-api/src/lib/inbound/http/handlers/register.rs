use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::UserResponseData;
use crate::domain::auth::errors::AuthError;
use crate::domain::auth::errors::ValidationErrors;
use crate::domain::auth::models::RegisterUserCommand;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::PlaintextPassword;
use crate::domain::user::models::UserName;
use crate::inbound::http::router::AppState;

pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<ApiSuccess<UserResponseData>, ApiError> {
    let Json(body) = body?;

    state
        .auth_service
        .register(body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|ref user| ApiSuccess::new(StatusCode::ACCEPTED, user.into()))
}

/// HTTP request body for registering a user (raw JSON)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    name: String,
    email: String,
    password: String,
}

impl RegisterRequest {
    fn try_into_command(self) -> Result<RegisterUserCommand, AuthError> {
        let mut errors = ValidationErrors::new();

        let name = UserName::new(self.name)
            .map_err(|e| errors.add("name", e))
            .ok();
        let email = EmailAddress::new(self.email)
            .map_err(|e| errors.add("email", e))
            .ok();
        let password = PlaintextPassword::new(self.password)
            .map_err(|e| errors.add("password", e))
            .ok();

        match (name, email, password) {
            (Some(name), Some(email), Some(password)) => Ok(RegisterUserCommand {
                name,
                email,
                password,
            }),
            _ => Err(AuthError::Validation(errors)),
        }
    }
}
