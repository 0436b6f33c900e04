//! Text consultation endpoint.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SymptomRequest {
    pub user_name: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct DiagnosisResponse {
    pub diagnosis: String,
}

/// Answer a symptom description in the context of the user's record.
/// POST /symptoms/analyze
///
/// Model failures are reported in `diagnosis` as `"Error: ..."` with status 200.
pub async fn analyze_symptoms(
    State(state): State<AppState>,
    Json(request): Json<SymptomRequest>,
) -> Json<DiagnosisResponse> {
    let diagnosis = state
        .handler
        .consult(&request.user_name, &request.text)
        .await;

    Json(DiagnosisResponse { diagnosis })
}
