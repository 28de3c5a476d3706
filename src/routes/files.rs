use axum::extract::State;
use axum::Json;

use crate::app_state::AppState;
use crate::error::AppError;
use crate::models::verification::FilesResponse;

/// GET /api/files: Spreadsheets accessible to the active service account.
pub async fn list_files(State(state): State<AppState>) -> Result<Json<FilesResponse>, AppError> {
    let files = state.lister.list_accessible().await?;
    Ok(Json(FilesResponse {
        count: files.len(),
        files,
    }))
}
