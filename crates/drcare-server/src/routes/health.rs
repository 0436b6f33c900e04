//! Status endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

pub const BANNER: &str = "Dr.Care AI Brain (Llama 4 Vision) is Online";

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub llm_configured: bool,
    pub version: String,
}

/// Liveness banner.
/// GET /
pub async fn home() -> Json<HomeResponse> {
    Json(HomeResponse {
        message: BANNER.to_string(),
    })
}

/// Health check endpoint.
/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        llm_configured: state.is_llm_configured(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
