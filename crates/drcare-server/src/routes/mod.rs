//! Route definitions for the REST API.

mod health;
mod symptoms;
mod vision;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Status
        .route("/", get(health::home))
        .route("/health", get(health::health_check))
        // Consultations
        .route("/symptoms/analyze", post(symptoms::analyze_symptoms))
        .route("/vision/analyze", post(vision::analyze_image))
        // Attach state
        .with_state(state)
}

pub use health::*;
pub use symptoms::*;
pub use vision::*;
