use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::error::{AppError, PipelineStage};
use crate::models::credential::ServiceAccountKey;
use crate::models::job::VerificationReport;
use crate::models::resource::{ExportFormat, Resource};
use crate::services::drive::SpreadsheetSource;
use crate::services::jobs::{JobStore, JobStoreError};
use crate::services::sheet_parser::{self, SAMPLE_ROWS};

pub const SUCCESS_MESSAGE: &str = "Verification successful!";
const DOWNLOAD_STEP: &str = "Downloading exported file...";
const PARSE_STEP: &str = "Parsing exported rows...";

/// Everything one job needs, captured when the job was started.
#[derive(Debug, Clone)]
pub struct VerificationTask {
    pub job_id: Uuid,
    pub credential: Arc<ServiceAccountKey>,
    pub resource: Resource,
    pub files_found: usize,
}

/// Runs the export -> download -> parse pipeline for a single job.
#[derive(Clone)]
pub struct VerificationWorker {
    source: Arc<dyn SpreadsheetSource>,
    jobs: Arc<JobStore>,
    format: ExportFormat,
}

impl VerificationWorker {
    pub fn new(source: Arc<dyn SpreadsheetSource>, jobs: Arc<JobStore>) -> Self {
        Self {
            source,
            jobs,
            format: ExportFormat::Csv,
        }
    }

    /// Claim the job, run the pipeline and publish exactly one terminal outcome.
    pub async fn run(&self, task: VerificationTask) {
        let job_id = task.job_id;
        let start = Instant::now();

        let export_step = format!("Exporting '{}' to {}...", task.resource.name, self.format.label());
        if let Err(e) = self.jobs.claim(job_id, &export_step).await {
            tracing::warn!(job_id = %job_id, error = %e, "Could not claim verification job");
            return;
        }

        tracing::info!(
            job_id = %job_id,
            resource_id = %task.resource.id,
            resource = %task.resource.name,
            "Processing verification job"
        );

        let outcome = self.execute(&task).await;
        metrics::histogram!("verification_processing_seconds").record(start.elapsed().as_secs_f64());

        match outcome {
            Ok(report) => {
                let row_count = report.row_count;
                match self.jobs.complete(job_id, report).await {
                    Ok(()) => {
                        metrics::counter!("verification_jobs_completed").increment(1);
                        tracing::info!(
                            job_id = %job_id,
                            row_count = row_count,
                            duration_ms = start.elapsed().as_millis() as u64,
                            "Job completed successfully"
                        );
                    }
                    Err(e) => log_rejected_write(job_id, &e),
                }
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!(job_id = %job_id, error = %message, "Job processing failed");
                match self.jobs.fail(job_id, &message).await {
                    Ok(()) => metrics::counter!("verification_jobs_failed").increment(1),
                    Err(e) => log_rejected_write(job_id, &e),
                }
            }
        }
    }

    async fn execute(&self, task: &VerificationTask) -> Result<VerificationReport, AppError> {
        let job_id = task.job_id;
        let credential = task.credential.as_ref();

        tracing::debug!(job_id = %job_id, "Requesting export");
        let ticket = self
            .source
            .request_export(credential, &task.resource, self.format)
            .await
            .map_err(|e| AppError::stage(PipelineStage::Export, e))?;

        self.step(job_id, DOWNLOAD_STEP).await?;
        let bytes = self
            .source
            .download(credential, &ticket)
            .await
            .map_err(|e| AppError::stage(PipelineStage::Download, e))?;

        self.step(job_id, PARSE_STEP).await?;
        let sheet = sheet_parser::parse_csv(&bytes)
            .map_err(|e| AppError::stage(PipelineStage::Parse, e))?;

        tracing::debug!(
            job_id = %job_id,
            columns = sheet.columns.len(),
            rows = sheet.row_count(),
            "Parsed export"
        );

        Ok(VerificationReport {
            message: SUCCESS_MESSAGE.to_string(),
            files_found: task.files_found,
            exported_file: ticket.file_name,
            row_count: sheet.row_count(),
            sample_data: sheet.sample(SAMPLE_ROWS),
            columns: sheet.columns,
        })
    }

    // Stops the pipeline when the job left `running` (e.g. it was cancelled).
    async fn step(&self, job_id: Uuid, step: &str) -> Result<(), AppError> {
        self.jobs
            .set_step(job_id, step)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))
    }
}

fn log_rejected_write(job_id: Uuid, error: &JobStoreError) {
    tracing::info!(
        job_id = %job_id,
        error = %error,
        "Discarding pipeline outcome for a job that is no longer running"
    );
}
