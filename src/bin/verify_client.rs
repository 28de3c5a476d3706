use sheets_verify::{
    config::ClientConfig,
    services::{
        api_client::ConsoleClient,
        poller::{JobOutcome, Poller, PollerConfig},
    },
};
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = ClientConfig::from_env().expect("Failed to load configuration");
    tracing::info!(api_base_url = %config.api_base_url, "Starting verification client");

    match run(config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = %e, "Verification client failed");
            ExitCode::from(2)
        }
    }
}

/// Returns whether the verification job completed successfully.
async fn run(config: ClientConfig) -> Result<bool, Box<dyn std::error::Error>> {
    let mut client = ConsoleClient::new(&config.api_base_url);

    if let Some(path) = &config.credential_file {
        let bytes = tokio::fs::read(path).await?;
        let file_name = Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("service_account.json");
        let uploaded = client.upload_credential(file_name, bytes).await?;
        tracing::info!(
            project_id = %uploaded.project_id,
            client_email = %uploaded.client_email,
            "Service account uploaded"
        );
    }

    let files = client.list_files().await?;
    tracing::info!(count = files.count, "Accessible spreadsheets listed");
    for file in &files.files {
        tracing::info!(id = %file.id, name = %file.name, "Spreadsheet");
    }

    let poller = Poller::new(PollerConfig {
        interval: Duration::from_millis(config.poll_interval_ms),
        timeout: Duration::from_secs(config.poll_timeout_secs),
    });

    let (job_id, outcome) = client
        .run_verification(&poller, |status, step| {
            tracing::info!(status = %status, step = %step, "Verification in progress");
        })
        .await?;

    match outcome {
        JobOutcome::Completed(report) => {
            tracing::info!(
                job_id = %job_id,
                exported_file = %report.exported_file,
                row_count = report.row_count,
                columns = ?report.columns,
                "{}",
                report.message
            );
            for (index, row) in report.sample_data.iter().enumerate() {
                tracing::info!(row = index + 1, data = ?row, "Sample row");
            }
            Ok(true)
        }
        JobOutcome::Failed(error) => {
            tracing::error!(job_id = %job_id, error = %error, "Verification failed");
            Ok(false)
        }
    }
}
