//! Image consultation endpoint.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::debug;

use drcare_core::error::DrCareError;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub analysis: String,
}

struct Upload {
    filename: String,
    bytes: Result<Vec<u8>, DrCareError>,
}

/// Analyze an uploaded medical image.
/// POST /vision/analyze (multipart: `user_name`, `file`)
///
/// Missing form fields are rejected with 422. Once both fields are present the
/// response is always 200, with failures reported as `"Error: ..."`.
pub async fn analyze_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<AnalysisResponse>> {
    let mut user_name: Option<String> = None;
    let mut upload: Option<Upload> = None;
    let mut stream_error: Option<DrCareError> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                stream_error = Some(DrCareError::upload(format!(
                    "Failed to read multipart body: {}",
                    e
                )));
                break;
            }
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("user_name") => {
                let value = field.text().await.map_err(|e| {
                    ApiError::validation(format!("Invalid user_name field: {}", e))
                })?;
                user_name = Some(value);
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map(|b| b.to_vec()).map_err(|e| {
                    DrCareError::upload(format!("Failed to read uploaded file: {}", e))
                });
                upload = Some(Upload { filename, bytes });
            }
            other => debug!(field = ?other, "Ignoring unknown form field"),
        }
    }

    let user_name = user_name.ok_or_else(|| DrCareError::missing_field("user_name"))?;

    let analysis = match (upload, stream_error) {
        (Some(Upload { filename, bytes: Ok(bytes) }), None) => {
            state
                .handler
                .analyze_image(&user_name, &filename, &bytes)
                .await
        }
        (Some(Upload { bytes: Err(err), .. }), _) => {
            state.handler.reject_upload(&user_name, err).await
        }
        (_, Some(err)) => state.handler.reject_upload(&user_name, err).await,
        (None, None) => return Err(DrCareError::missing_field("file").into()),
    };

    Ok(Json(AnalysisResponse { analysis }))
}
