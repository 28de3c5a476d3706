use axum::routing::{get, post};
use axum::Router;

use crate::app_state::AppState;

pub mod credentials;
pub mod files;
pub mod health;
pub mod metrics;
pub mod search;
pub mod verify;

/// Console API routes, without middleware or the metrics endpoint.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::index))
        .route("/health", get(health::health_check))
        .route("/api/upload-sa", post(credentials::upload_service_account))
        .route("/api/files", get(files::list_files))
        .route("/api/start-verify", post(verify::start_verification))
        .route("/api/verify-status/{job_id}", get(verify::get_job_status))
        .route("/api/cancel-verify/{job_id}", post(verify::cancel_verification))
        .route("/api/search", get(search::search))
        .with_state(state)
}
