use axum::extract::Request;
use axum::extract::State;
use axum::http::header;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;

use super::handlers::ApiError;
use crate::domain::auth::errors::AuthError;
use crate::domain::user::models::User;
use crate::inbound::http::router::AppState;

/// Extension type carrying the user resolved from a bearer token.
///
/// Absent on anonymous requests.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Middleware that resolves an optional bearer token to a user.
///
/// Requests without an `Authorization` header pass through anonymously. A
/// malformed header or an unusable token ends the request with 401.
pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let authorization = req.headers().get(header::AUTHORIZATION).cloned();

    let mut response = match resolve_user(&state, authorization).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(AuthenticatedUser(user));
            next.run(req).await
        }
        Ok(None) => next.run(req).await,
        Err(e) => e.into_response(),
    };

    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Authorization"));
    response
}

async fn resolve_user(
    state: &AppState,
    authorization: Option<HeaderValue>,
) -> Result<Option<User>, ApiError> {
    let Some(value) = authorization else {
        return Ok(None);
    };

    let token = bearer_token(&value).ok_or_else(|| {
        tracing::debug!("Malformed Authorization header");
        ApiError::from(AuthError::InvalidCredentials)
    })?;

    let user = state.auth_service.authenticate_bearer(token).await?;
    Ok(Some(user))
}

/// Token from a header of exactly the form `Bearer <token>`.
fn bearer_token(value: &HeaderValue) -> Option<&str> {
    let value = value.to_str().ok()?;
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token),
        _ => None,
    }
}

/// Gate rejecting anonymous requests with 401.
pub async fn require_authenticated_user(req: Request, next: Next) -> Result<Response, ApiError> {
    if req.extensions().get::<AuthenticatedUser>().is_none() {
        return Err(AuthError::AuthenticationRequired.into());
    }
    Ok(next.run(req).await)
}

/// Gate rejecting anonymous requests with 401 and inactive accounts with 403.
pub async fn require_activated_user(req: Request, next: Next) -> Result<Response, ApiError> {
    let activated = req
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|AuthenticatedUser(user)| user.activated);

    match activated {
        None => Err(AuthError::AuthenticationRequired.into()),
        Some(false) => Err(AuthError::InactiveAccount.into()),
        Some(true) => Ok(next.run(req).await),
    }
}
