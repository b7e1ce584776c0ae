use std::collections::BTreeMap;

use auth::SessionTokens;
use axum::extract::rejection::JsonRejection;
use axum::http::header;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use axum_extra::extract::CookieJar;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use super::cookies::refresh_cookie;
use crate::domain::auth::errors::AuthError;
use crate::domain::user::models::User;

pub mod activate;
pub mod get_user;
pub mod google_callback;
pub mod google_login;
pub mod healthcheck;
pub mod login;
pub mod me;
pub mod refresh;
pub mod register;

const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";
const INVALID_TOKEN_MESSAGE: &str = "invalid or missing authentication token";

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    ValidationFailed(BTreeMap<String, String>),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
    InvalidToken,
    Forbidden(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::InternalServerError(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            ApiError::InternalServerError(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    SERVER_ERROR_MESSAGE.to_string(),
                    None,
                )
            }
            ApiError::ValidationFailed(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "failed validation".to_string(),
                Some(errors),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            ApiError::InvalidToken => {
                let body = ApiResponseBody::new_error(
                    StatusCode::UNAUTHORIZED,
                    INVALID_TOKEN_MESSAGE.to_string(),
                    None,
                );
                return (
                    StatusCode::UNAUTHORIZED,
                    [(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"))],
                    Json(body),
                )
                    .into_response();
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
        };

        (status, Json(ApiResponseBody::new_error(status, message, errors))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(errors) => ApiError::ValidationFailed(errors.into_inner()),
            AuthError::DuplicateEmail => field_error("email", &err),
            AuthError::InvalidActivationToken => field_error("token", &err),
            AuthError::InvalidCredentials | AuthError::AuthenticationRequired => {
                ApiError::Unauthorized(err.to_string())
            }
            AuthError::InvalidAuthenticationToken => ApiError::InvalidToken,
            AuthError::NotCredentialsAccount
            | AuthError::ProviderConflict
            | AuthError::InvalidOAuthState
            | AuthError::MissingRefreshToken => ApiError::BadRequest(err.to_string()),
            AuthError::InactiveAccount => ApiError::Forbidden(err.to_string()),
            AuthError::EditConflict => ApiError::Conflict(err.to_string()),
            AuthError::NotFound => ApiError::NotFound(err.to_string()),
            AuthError::Federation(_)
            | AuthError::Token(_)
            | AuthError::Password(_)
            | AuthError::Database(_)
            | AuthError::Unknown(_) => ApiError::InternalServerError(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

fn field_error(field: &str, err: &AuthError) -> ApiError {
    ApiError::ValidationFailed(BTreeMap::from([(field.to_string(), err.to_string())]))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data,
        }
    }
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(
        status_code: StatusCode,
        message: String,
        errors: Option<BTreeMap<String, String>>,
    ) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data: ApiErrorData { message, errors },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

/// Client view of a user; never carries the credential or version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponseData {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    pub picture: Option<String>,
    pub activated: bool,
    pub auth_provider: String,
}

impl From<&User> for UserResponseData {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.0,
            created_at: user.created_at,
            name: user.name.as_str().to_string(),
            email: user.email.as_str().to_string(),
            picture: user.picture.clone(),
            activated: user.activated,
            auth_provider: user.auth_provider.as_str().to_string(),
        }
    }
}

/// Body returned by every endpoint that opens or renews a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponseData {
    pub access_token: String,
}

/// Access token in the body, refresh token in the `jwt` cookie.
pub fn session_response(
    jar: CookieJar,
    session: SessionTokens,
    secure_cookies: bool,
) -> (CookieJar, ApiSuccess<AccessTokenResponseData>) {
    let max_age = session.refresh_max_age(Utc::now());
    let jar = jar.add(refresh_cookie(&session.refresh_token, max_age, secure_cookies));

    (
        jar,
        ApiSuccess::new(
            StatusCode::OK,
            AccessTokenResponseData {
                access_token: session.access_token,
            },
        ),
    )
}

/// Catch-all for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound(AuthError::NotFound.to_string())
}
