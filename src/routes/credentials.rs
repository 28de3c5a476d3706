use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::app_state::AppState;
use crate::error::AppError;
use crate::models::verification::UploadResponse;

/// Upload failures carry `success: false` next to the error message.
pub struct UploadRejection(AppError);

impl From<AppError> for UploadRejection {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for UploadRejection {
    fn into_response(self) -> Response {
        tracing::debug!(error = %self.0, "Service account upload rejected");
        (
            self.0.status_code(),
            Json(json!({ "success": false, "error": self.0.to_string() })),
        )
            .into_response()
    }
}

/// POST /api/upload-sa: Upload a service-account JSON key as multipart field `file`.
pub async fn upload_service_account(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, UploadRejection> {
    let mut multipart =
        multipart.map_err(|_| AppError::InvalidCredential("No file provided".to_string()))?;
    let mut file_bytes = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidCredential(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        if field.file_name() == Some("") {
            return Err(AppError::InvalidCredential("No file selected".to_string()).into());
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidCredential(format!("Malformed upload: {e}")))?;
        file_bytes = Some(data);
    }

    let file_bytes = file_bytes
        .ok_or_else(|| AppError::InvalidCredential("No file provided".to_string()))?;

    let summary = state.credentials.upload(&file_bytes).await?;
    Ok(Json(UploadResponse::from(summary)))
}
