use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use strum::Display;
use uuid::Uuid;

use crate::services::drive::SourceError;

/// Pipeline stage a verification job was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PipelineStage {
    Export,
    Download,
    Parse,
}

/// Errors surfaced by the console API and the verification pipeline.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidCredential(String),

    #[error("No service account uploaded")]
    NoCredential,

    #[error("No Google Sheets found accessible by this service account")]
    NoResources,

    #[error("{0}")]
    Upstream(#[from] SourceError),

    #[error("{stage} failed: {message}")]
    PipelineStage {
        stage: PipelineStage,
        message: String,
    },

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("{0}")]
    InvalidQuery(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn stage(stage: PipelineStage, cause: impl std::fmt::Display) -> Self {
        AppError::PipelineStage {
            stage,
            message: cause.to_string(),
        }
    }

    pub fn job_not_found(job_id: Uuid) -> Self {
        AppError::JobNotFound(job_id.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCredential(_) | AppError::NoCredential | AppError::InvalidQuery(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NoResources => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::JobNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::PipelineStage { .. } | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_failure_names_the_stage() {
        let err = AppError::stage(PipelineStage::Export, "resource not found");
        assert_eq!(err.to_string(), "export failed: resource not found");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_client_errors_are_4xx() {
        assert_eq!(AppError::NoCredential.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::JobNotFound("unknown-id".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert!(AppError::NoResources.status_code().is_client_error());
    }
}
