use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use super::ApiSuccess;
use crate::inbound::http::router::AppState;

pub async fn healthcheck(State(state): State<AppState>) -> ApiSuccess<HealthcheckResponseData> {
    ApiSuccess::new(
        StatusCode::OK,
        HealthcheckResponseData {
            status: "available",
            environment: state.environment.clone(),
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthcheckResponseData {
    pub status: &'static str,
    pub environment: String,
    pub version: &'static str,
}
