use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::activate::activate;
use super::handlers::get_user::get_user;
use super::handlers::google_callback::google_callback;
use super::handlers::google_login::google_login;
use super::handlers::healthcheck::healthcheck;
use super::handlers::login::login;
use super::handlers::me::me;
use super::handlers::not_found;
use super::handlers::refresh::refresh;
use super::handlers::register::register;
use super::middleware::authenticate;
use super::middleware::require_activated_user;
use super::middleware::require_authenticated_user;
use crate::domain::auth::ports::AuthServicePort;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthServicePort>,
    /// Whether session cookies carry the `Secure` attribute.
    pub secure_cookies: bool,
    pub environment: String,
}

/// Build the HTTP application.
///
/// # Arguments
/// * `auth_service` - Authentication core
/// * `secure_cookies` - Set `Secure` on every cookie the API issues
/// * `environment` - Deployment name reported by the healthcheck
pub fn create_router(
    auth_service: Arc<dyn AuthServicePort>,
    secure_cookies: bool,
    environment: impl Into<String>,
) -> Router {
    let state = AppState {
        auth_service,
        secure_cookies,
        environment: environment.into(),
    };

    let public_routes = Router::new()
        .route("/healthcheck", get(healthcheck))
        .route("/auth/register", post(register))
        .route("/auth/activate", put(activate))
        .route("/auth/login", post(login))
        .route("/auth/google", get(google_login))
        .route("/auth/google/callback", get(google_callback))
        .route("/auth/refresh", post(refresh))
        .route("/users/:user_id", get(get_user));

    let activated_routes = Router::new()
        .route("/auth/me", get(me))
        .route_layer(middleware::from_fn(require_activated_user))
        .route_layer(middleware::from_fn(require_authenticated_user));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(activated_routes)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
