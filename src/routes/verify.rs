use axum::extract::{Path, State};
use axum::Json;

use crate::app_state::AppState;
use crate::error::AppError;
use crate::models::verification::{JobStatusResponse, StartVerifyResponse};
use crate::services::orchestrator::parse_job_id;

/// POST /api/start-verify: Start a background verification job.
pub async fn start_verification(
    State(state): State<AppState>,
) -> Result<Json<StartVerifyResponse>, AppError> {
    let job_id = state.orchestrator.start_verification().await?;

    Ok(Json(StartVerifyResponse {
        job_id,
        status: "started".to_string(),
    }))
}

/// GET /api/verify-status/{job_id}: Check verification job status.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, AppError> {
    let job_id = parse_job_id(&job_id)?;
    let view = state.orchestrator.get_status(job_id).await?;
    Ok(Json(JobStatusResponse { job_id, view }))
}

/// POST /api/cancel-verify/{job_id}: Stop a job that has not finished yet.
pub async fn cancel_verification(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, AppError> {
    let job_id = parse_job_id(&job_id)?;
    let view = state.orchestrator.cancel(job_id).await?;
    Ok(Json(JobStatusResponse { job_id, view }))
}
