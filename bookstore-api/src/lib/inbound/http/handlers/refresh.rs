use axum::extract::State;
use axum_extra::extract::CookieJar;

use super::session_response;
use super::AccessTokenResponseData;
use super::ApiError;
use super::ApiSuccess;
use crate::domain::auth::errors::AuthError;
use crate::inbound::http::cookies::REFRESH_COOKIE;
use crate::inbound::http::router::AppState;

/// Trade the `jwt` cookie for a new access token and a rotated cookie.
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiSuccess<AccessTokenResponseData>), ApiError> {
    let refresh_token = jar
        .get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or(AuthError::MissingRefreshToken)?;

    let session = state.auth_service.refresh(&refresh_token).await?;

    Ok(session_response(jar, session, state.secure_cookies))
}
