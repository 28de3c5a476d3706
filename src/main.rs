use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use sheets_verify::app_state::AppState;
use sheets_verify::config::AppConfig;
use sheets_verify::routes::{self, metrics::MetricsState};
use sheets_verify::services::{
    credentials::{CredentialStore, CredentialVault},
    drive::GoogleDriveClient,
    encryption::CredentialCipher,
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing sheets-verify server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_histogram!(
        "verification_processing_seconds",
        "Time to run the export, download and parse pipeline for one job"
    );
    metrics::describe_counter!(
        "verification_jobs_total",
        "Total verification jobs started"
    );
    metrics::describe_counter!(
        "verification_jobs_completed",
        "Total verification jobs completed"
    );
    metrics::describe_counter!(
        "verification_jobs_failed",
        "Total verification jobs that ended in error"
    );
    metrics::describe_counter!(
        "verification_jobs_cancelled",
        "Total verification jobs cancelled by an operator"
    );
    metrics::describe_gauge!(
        "verification_jobs_active",
        "Verification jobs currently held, by status"
    );
    metrics::describe_gauge!(
        "verification_jobs_stale",
        "Jobs still pending past the staleness threshold"
    );

    // Credential store, optionally persisted
    let credentials = match &config.credential_path {
        Some(path) => {
            let cipher = match &config.credential_key {
                Some(key) => Some(
                    CredentialCipher::from_base64(key)
                        .expect("Failed to initialize credential encryption"),
                ),
                None => {
                    tracing::warn!("CREDENTIAL_KEY not set, persisting credential unencrypted");
                    None
                }
            };
            tracing::info!(path = %path, "Persisting service account credential to disk");
            CredentialStore::with_vault(CredentialVault::new(path, cipher)).await
        }
        None => CredentialStore::in_memory(),
    };

    // Initialize Google Drive client
    tracing::info!(base_url = %config.drive_api_base, "Initializing Google Drive client");
    let drive = GoogleDriveClient::new(
        &config.drive_api_base,
        config.file_page_size,
        config.http_timeout(),
    )
    .expect("Failed to initialize Google Drive client");

    // Create shared application state
    let state = AppState::new(
        credentials,
        Arc::new(drive),
        config.search_max_spreadsheets,
        config.stale_job_after(),
    );

    // Surface jobs that never get picked up
    let _watchdog = state
        .orchestrator
        .spawn_watchdog(config.stale_job_after(), config.watchdog_interval());

    let metrics_state = MetricsState {
        handle: prometheus_handle,
        jobs: state.jobs().clone(),
    };

    // Build API routes
    let app = routes::api_router(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(metrics_state),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(1024 * 1024)); // 1 MB limit

    tracing::info!("Starting sheets-verify on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
