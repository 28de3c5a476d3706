use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::services::jobs::JobStore;

#[derive(Clone)]
pub struct MetricsState {
    pub handle: Arc<PrometheusHandle>,
    pub jobs: Arc<JobStore>,
}

/// Prometheus metrics scrape endpoint.
/// Job gauges are refreshed from the job store before rendering.
pub async fn prometheus_metrics(State(state): State<MetricsState>) -> impl IntoResponse {
    let counts = state.jobs.counts().await;
    for (status, count) in [
        ("pending", counts.pending),
        ("running", counts.running),
        ("completed", counts.completed),
        ("error", counts.error),
    ] {
        metrics::gauge!("verification_jobs_active", "status" => status).set(count as f64);
    }
    state.handle.render()
}
