use axum::extract::Query;
use axum::extract::State;
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::session_response;
use super::AccessTokenResponseData;
use super::ApiError;
use super::ApiSuccess;
use crate::domain::auth::errors::AuthError;
use crate::domain::auth::errors::ValidationErrors;
use crate::domain::auth::models::FederatedCallback;
use crate::inbound::http::cookies::clear_oauth_state_cookie;
use crate::inbound::http::cookies::OAUTH_STATE_COOKIE;
use crate::inbound::http::router::AppState;

/// Finish a federated login. The state cookie is consumed whatever the
/// outcome.
pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<GoogleCallbackParams>,
) -> (CookieJar, Result<ApiSuccess<AccessTokenResponseData>, ApiError>) {
    let expected_state = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|cookie| cookie.value().to_string());
    let jar = jar.add(clear_oauth_state_cookie(state.secure_cookies));

    if params.code.is_empty() {
        let error = AuthError::Validation(ValidationErrors::single("code", "must be provided"));
        return (jar, Err(error.into()));
    }

    let callback = FederatedCallback {
        code: params.code,
        state: params.state,
        expected_state,
    };

    match state.auth_service.complete_federated_login(callback).await {
        Ok(session) => {
            let (jar, body) = session_response(jar, session, state.secure_cookies);
            (jar, Ok(body))
        }
        Err(e) => (jar, Err(e.into())),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GoogleCallbackParams {
    code: String,
    state: String,
}
