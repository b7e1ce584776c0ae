use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::CookieJar;
use serde::Serialize;

use super::ApiSuccess;
use crate::inbound::http::cookies::oauth_state_cookie;
use crate::inbound::http::router::AppState;

/// Hand out the consent URL and bind its `state` to the browser.
pub async fn google_login(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, ApiSuccess<GoogleLoginResponseData>) {
    let start = state.auth_service.begin_federated_login();

    (
        jar.add(oauth_state_cookie(&start.state, state.secure_cookies)),
        ApiSuccess::new(StatusCode::OK, GoogleLoginResponseData { url: start.url }),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoogleLoginResponseData {
    pub url: String,
}
