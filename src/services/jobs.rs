//! In-memory job table. Every state change goes through here so the
//! pending -> running -> completed | error machine is enforced in one place.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::job::{
    JobStatus, JobView, StatusTransition, VerificationJob, VerificationReport,
};

pub const INITIAL_STEP: &str = "Starting...";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum JobStoreError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub error: usize,
}

#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, VerificationJob>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh `pending` job under a new id.
    pub async fn create(&self) -> VerificationJob {
        let now = Utc::now();
        let job = VerificationJob {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            step: Some(INITIAL_STEP.to_string()),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            history: vec![StatusTransition {
                status: JobStatus::Pending,
                at: now,
            }],
        };

        self.jobs.write().await.insert(job.id, job.clone());
        job
    }

    pub async fn get(&self, id: Uuid) -> Option<VerificationJob> {
        self.jobs.read().await.get(&id).cloned()
    }

    pub async fn view(&self, id: Uuid) -> Result<JobView, JobStoreError> {
        self.jobs
            .read()
            .await
            .get(&id)
            .map(VerificationJob::view)
            .ok_or(JobStoreError::NotFound(id))
    }

    /// pending -> running. Succeeds once per job.
    pub async fn claim(&self, id: Uuid, step: &str) -> Result<(), JobStoreError> {
        self.transition(id, &[JobStatus::Pending], JobStatus::Running, |job| {
            job.step = Some(step.to_string());
        })
        .await
    }

    /// Update progress text of a running job.
    pub async fn set_step(&self, id: Uuid, step: &str) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(JobStoreError::NotFound(id))?;
        if job.status != JobStatus::Running {
            return Err(JobStoreError::InvalidTransition {
                id,
                from: job.status,
                to: JobStatus::Running,
            });
        }
        job.step = Some(step.to_string());
        job.updated_at = Utc::now();
        Ok(())
    }

    pub async fn complete(&self, id: Uuid, report: VerificationReport) -> Result<(), JobStoreError> {
        self.transition(id, &[JobStatus::Running], JobStatus::Completed, |job| {
            job.step = None;
            job.result = Some(report);
        })
        .await
    }

    pub async fn fail(&self, id: Uuid, message: &str) -> Result<(), JobStoreError> {
        self.transition(id, &[JobStatus::Running], JobStatus::Error, |job| {
            job.step = None;
            job.error = Some(message.to_string());
        })
        .await
    }

    /// Move a non-terminal job to `error`. Returns the resulting view and
    /// whether this call changed anything; terminal jobs are left untouched.
    pub async fn cancel(&self, id: Uuid, reason: &str) -> Result<(JobView, bool), JobStoreError> {
        let result = self
            .transition(
                id,
                &[JobStatus::Pending, JobStatus::Running],
                JobStatus::Error,
                |job| {
                    job.step = None;
                    job.error = Some(reason.to_string());
                },
            )
            .await;

        match result {
            Ok(()) => Ok((self.view(id).await?, true)),
            Err(JobStoreError::InvalidTransition { .. }) => Ok((self.view(id).await?, false)),
            Err(e) => Err(e),
        }
    }

    pub async fn counts(&self) -> JobCounts {
        let jobs = self.jobs.read().await;
        let mut counts = JobCounts::default();
        for job in jobs.values() {
            match job.status {
                JobStatus::Pending => counts.pending += 1,
                JobStatus::Running => counts.running += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Error => counts.error += 1,
            }
        }
        counts
    }

    /// Jobs still `pending` after `max_age`, oldest first.
    pub async fn stale_pending(&self, max_age: Duration) -> Vec<(Uuid, DateTime<Utc>)> {
        let Some(cutoff) = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
        else {
            return Vec::new();
        };

        let jobs = self.jobs.read().await;
        let mut stale: Vec<_> = jobs
            .values()
            .filter(|job| job.status == JobStatus::Pending && job.created_at <= cutoff)
            .map(|job| (job.id, job.created_at))
            .collect();
        stale.sort_by_key(|(_, created_at)| *created_at);
        stale
    }

    async fn transition(
        &self,
        id: Uuid,
        allowed_from: &[JobStatus],
        to: JobStatus,
        apply: impl FnOnce(&mut VerificationJob),
    ) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(JobStoreError::NotFound(id))?;

        if !allowed_from.contains(&job.status) {
            return Err(JobStoreError::InvalidTransition {
                id,
                from: job.status,
                to,
            });
        }

        let now = Utc::now();
        apply(job);
        job.status = to;
        job.updated_at = now;
        job.history.push(StatusTransition { status: to, at: now });
        Ok(())
    }
}
