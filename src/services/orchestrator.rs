//! Starts verification jobs in the background and answers status queries.
//!
//! Callers get a job id back as soon as the preconditions hold; progress is
//! observable only through the job store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::job::JobView;
use crate::services::jobs::{JobStore, JobStoreError};
use crate::services::poller::{PollError, StatusSource};
use crate::services::resources::ResourceLister;
use crate::services::worker::{VerificationTask, VerificationWorker};

pub const CANCELLED_MESSAGE: &str = "verification cancelled by operator";

pub const MIN_WATCHDOG_INTERVAL: Duration = Duration::from_secs(1);

/// Parse a client-supplied job id. Malformed ids are reported as unknown jobs.
pub fn parse_job_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::JobNotFound(raw.to_string()))
}

pub struct Orchestrator {
    lister: ResourceLister,
    jobs: Arc<JobStore>,
    worker: VerificationWorker,
    tasks: Arc<Mutex<HashMap<Uuid, AbortHandle>>>,
}

impl Orchestrator {
    pub fn new(lister: ResourceLister, jobs: Arc<JobStore>) -> Self {
        let worker = VerificationWorker::new(lister.source().clone(), jobs.clone());
        Self {
            lister,
            jobs,
            worker,
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn jobs(&self) -> &Arc<JobStore> {
        &self.jobs
    }

    /// Create a `pending` job for the first accessible spreadsheet and hand it
    /// to a background worker. Fails without creating a job when no credential
    /// is active or nothing is accessible.
    pub async fn start_verification(&self) -> Result<Uuid, AppError> {
        let credential = self.lister.credentials().require_active().await?;
        let resources = self.lister.list_with(&credential).await?;
        let files_found = resources.len();
        let resource = resources.into_iter().next().ok_or(AppError::NoResources)?;

        let job = self.jobs.create().await;
        let job_id = job.id;
        metrics::counter!("verification_jobs_total").increment(1);

        let task = VerificationTask {
            job_id,
            credential,
            resource,
            files_found,
        };

        // The lock is held across spawn so the task's own cleanup runs after the insert.
        let mut tasks = self.tasks.lock().await;
        let worker = self.worker.clone();
        let registry = self.tasks.clone();
        let handle = tokio::spawn(async move {
            worker.run(task).await;
            registry.lock().await.remove(&job_id);
        });
        tasks.insert(job_id, handle.abort_handle());
        drop(tasks);

        tracing::info!(job_id = %job_id, files_found = files_found, "Verification job started");
        Ok(job_id)
    }

    pub async fn get_status(&self, job_id: Uuid) -> Result<JobView, AppError> {
        self.jobs.view(job_id).await.map_err(|e| match e {
            JobStoreError::NotFound(id) => AppError::job_not_found(id),
            other => AppError::Internal(other.to_string()),
        })
    }

    /// End a non-terminal job with an error and stop its worker. Terminal jobs
    /// are returned unchanged.
    pub async fn cancel(&self, job_id: Uuid) -> Result<JobView, AppError> {
        let (view, changed) = self
            .jobs
            .cancel(job_id, CANCELLED_MESSAGE)
            .await
            .map_err(|e| match e {
                JobStoreError::NotFound(id) => AppError::job_not_found(id),
                other => AppError::Internal(other.to_string()),
            })?;

        if changed {
            if let Some(handle) = self.tasks.lock().await.remove(&job_id) {
                handle.abort();
            }
            metrics::counter!("verification_jobs_cancelled").increment(1);
            tracing::info!(job_id = %job_id, "Verification job cancelled");
        }

        Ok(view)
    }

    /// Periodically report jobs that never left `pending`. They are left as is.
    ///
    /// The sweep runs at most once per [`MIN_WATCHDOG_INTERVAL`].
    pub fn spawn_watchdog(&self, stale_after: Duration, interval: Duration) -> JoinHandle<()> {
        let jobs = self.jobs.clone();
        let interval = interval.max(MIN_WATCHDOG_INTERVAL);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let stale = jobs.stale_pending(stale_after).await;
                metrics::gauge!("verification_jobs_stale").set(stale.len() as f64);
                for (job_id, created_at) in &stale {
                    tracing::warn!(
                        job_id = %job_id,
                        created_at = %created_at,
                        "Verification job has not been claimed by a worker"
                    );
                }
            }
        })
    }
}

#[async_trait]
impl StatusSource for Orchestrator {
    async fn job_status(&self, job_id: Uuid) -> Result<JobView, PollError> {
        self.get_status(job_id)
            .await
            .map_err(|e| PollError::Source(e.to_string()))
    }
}
