use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::services::jobs::JobCounts;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub credential: ComponentHealth,
    pub jobs: JobHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Serialize)]
pub struct JobHealth {
    #[serde(flatten)]
    pub counts: JobCounts,
    pub stale: usize,
}

/// GET /: Service banner.
pub async fn index() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "Google Sheets Verification API" }))
}

/// GET /health: credential presence and job liveness.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let credential = match state.credentials.active().await {
        Some(key) => ComponentHealth {
            status: "ok".to_string(),
            detail: Some(key.client_email.clone()),
        },
        None => ComponentHealth {
            status: "missing".to_string(),
            detail: None,
        },
    };

    let jobs = state.jobs();
    let stale = jobs.stale_pending(state.stale_job_after).await.len();
    let job_health = JobHealth {
        counts: jobs.counts().await,
        stale,
    };

    // A missing credential is a setup step, not an outage; stuck jobs are.
    let healthy = stale == 0;
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if healthy {
            "ok".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            credential,
            jobs: job_health,
        },
    };

    (status_code, Json(response))
}
