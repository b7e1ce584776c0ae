use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::session_response;
use super::AccessTokenResponseData;
use super::ApiError;
use super::ApiSuccess;
use crate::domain::auth::errors::AuthError;
use crate::domain::auth::errors::ValidationErrors;
use crate::domain::auth::models::LoginCommand;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::PlaintextPassword;
use crate::inbound::http::router::AppState;

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, ApiSuccess<AccessTokenResponseData>), ApiError> {
    let Json(body) = body?;

    let session = state.auth_service.login(body.try_into_command()?).await?;

    Ok(session_response(jar, session, state.secure_cookies))
}

/// HTTP request body for credential login (raw JSON)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    email: String,
    password: String,
}

impl LoginRequest {
    fn try_into_command(self) -> Result<LoginCommand, AuthError> {
        let mut errors = ValidationErrors::new();

        let email = EmailAddress::new(self.email)
            .map_err(|e| errors.add("email", e))
            .ok();
        let password = PlaintextPassword::new(self.password)
            .map_err(|e| errors.add("password", e))
            .ok();

        match (email, password) {
            (Some(email), Some(password)) => Ok(LoginCommand { email, password }),
            _ => Err(AuthError::Validation(errors)),
        }
    }
}
