//! Cookies carrying the refresh token and the OAuth state binding.

use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::cookie::SameSite;
use time::Duration;

/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "jwt";
/// Cookie name for the pending OAuth `state`.
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

const OAUTH_STATE_MAX_AGE_MINUTES: i64 = 10;

/// Build an httpOnly cookie for the refresh token.
pub fn refresh_cookie(token: &str, max_age: chrono::Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::None)
        .path("/")
        .max_age(Duration::seconds(max_age.num_seconds()))
        .build()
}

/// Build an httpOnly cookie binding `state` to this browser.
pub fn oauth_state_cookie(state: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE, state.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::minutes(OAUTH_STATE_MAX_AGE_MINUTES))
        .build()
}

/// Build an expired state cookie; the binding is single-use.
pub fn clear_oauth_state_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE, String::new()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}
