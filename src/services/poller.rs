//! Consumer side of the start/poll protocol.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use uuid::Uuid;

use crate::models::job::{JobStatus, JobView, VerificationReport};

/// Anything that can report the current view of a job.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn job_status(&self, job_id: Uuid) -> Result<JobView, PollError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// Liveness failure: the job may still finish later.
    #[error("job {job_id} did not finish within {}s", .waited.as_secs())]
    Timeout { job_id: Uuid, waited: Duration },

    #[error("status request failed: {0}")]
    Source(String),
}

/// Terminal result of a job, delivered once.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(VerificationReport),
    Failed(String),
}

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Poller {
    config: PollerConfig,
}

impl Poller {
    pub fn new(config: PollerConfig) -> Self {
        Self { config }
    }

    /// Query `job_id` every interval until it is terminal.
    ///
    /// `on_progress` sees the step text of every non-terminal poll; `pending`
    /// and `running` are treated alike. Giving up after the timeout leaves the
    /// job untouched.
    pub async fn wait<S>(
        &self,
        source: &S,
        job_id: Uuid,
        mut on_progress: impl FnMut(JobStatus, &str) + Send,
    ) -> Result<JobOutcome, PollError>
    where
        S: StatusSource + ?Sized,
    {
        let started = Instant::now();
        let deadline = started + self.config.timeout;

        loop {
            match source.job_status(job_id).await? {
                JobView::Completed { result } => return Ok(JobOutcome::Completed(result)),
                JobView::Error { error } => return Ok(JobOutcome::Failed(error)),
                JobView::Pending { step } => on_progress(JobStatus::Pending, &step),
                JobView::Running { step } => on_progress(JobStatus::Running, &step),
            }

            if Instant::now() >= deadline {
                tracing::warn!(job_id = %job_id, "Gave up waiting for verification job");
                return Err(PollError::Timeout {
                    job_id,
                    waited: started.elapsed(),
                });
            }
            sleep(self.config.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    struct Scripted {
        views: Mutex<VecDeque<JobView>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(views: Vec<JobView>) -> Self {
            Self {
                views: Mutex::new(views.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl StatusSource for Scripted {
        async fn job_status(&self, _job_id: Uuid) -> Result<JobView, PollError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut views = self.views.lock().await;
            // The last view repeats once the script runs out.
            if views.len() > 1 {
                Ok(views.pop_front().unwrap())
            } else {
                views
                    .front()
                    .cloned()
                    .ok_or_else(|| PollError::Source("empty script".into()))
            }
        }
    }

    fn report() -> VerificationReport {
        VerificationReport {
            message: "Verification successful!".into(),
            files_found: 1,
            exported_file: "Ledger".into(),
            row_count: 12,
            columns: vec!["Name".into(), "Amount".into()],
            sample_data: vec![],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reports_every_step_then_result_once() {
        let source = Scripted::new(vec![
            JobView::Pending {
                step: "Starting...".into(),
            },
            JobView::Running {
                step: "Exporting...".into(),
            },
            JobView::Running {
                step: "Parsing...".into(),
            },
            JobView::Completed { result: report() },
        ]);

        let mut seen = Vec::new();
        let outcome = Poller::default()
            .wait(&source, Uuid::new_v4(), |status, step| {
                seen.push((status, step.to_string()))
            })
            .await
            .unwrap();

        assert_eq!(outcome, JobOutcome::Completed(report()));
        assert_eq!(
            seen,
            vec![
                (JobStatus::Pending, "Starting...".to_string()),
                (JobStatus::Running, "Exporting...".to_string()),
                (JobStatus::Running, "Parsing...".to_string()),
            ]
        );
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_is_terminal() {
        let source = Scripted::new(vec![JobView::Error {
            error: "export failed: resource not found".into(),
        }]);
        let outcome = Poller::default()
            .wait(&source, Uuid::new_v4(), |_, _| panic!("no progress expected"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            JobOutcome::Failed("export failed: resource not found".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_on_a_stuck_job() {
        let source = Scripted::new(vec![JobView::Pending {
            step: "Starting...".into(),
        }]);
        let poller = Poller::new(PollerConfig {
            interval: Duration::from_millis(1000),
            timeout: Duration::from_secs(5),
        });

        let err = poller
            .wait(&source, Uuid::new_v4(), |_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::Timeout { .. }));
        assert_eq!(source.calls.load(Ordering::SeqCst), 6);
    }
}
