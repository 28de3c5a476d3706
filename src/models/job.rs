use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// Status of a verification job. `Completed` and `Error` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

/// One row of exported sheet data, keyed by column name in sheet order.
pub type SampleRow = serde_json::Map<String, serde_json::Value>;

/// Outcome of a successful export, download and parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub message: String,
    pub files_found: usize,
    pub exported_file: String,
    pub row_count: usize,
    pub columns: Vec<String>,
    pub sample_data: Vec<SampleRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusTransition {
    pub status: JobStatus,
    pub at: DateTime<Utc>,
}

/// A verification job record as held by the job store.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationJob {
    pub id: Uuid,
    pub status: JobStatus,
    pub step: Option<String>,
    pub result: Option<VerificationReport>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub history: Vec<StatusTransition>,
}

impl VerificationJob {
    pub fn view(&self) -> JobView {
        match self.status {
            JobStatus::Pending => JobView::Pending {
                step: self.step.clone().unwrap_or_default(),
            },
            JobStatus::Running => JobView::Running {
                step: self.step.clone().unwrap_or_default(),
            },
            JobStatus::Completed => match &self.result {
                Some(result) => JobView::Completed {
                    result: result.clone(),
                },
                None => JobView::Error {
                    error: "job completed without a result".to_string(),
                },
            },
            JobStatus::Error => JobView::Error {
                error: self.error.clone().unwrap_or_default(),
            },
        }
    }
}

/// Snapshot of a job as seen by pollers; the payload depends on the status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobView {
    Pending { step: String },
    Running { step: String },
    Completed { result: VerificationReport },
    Error { error: String },
}

impl JobView {
    pub fn status(&self) -> JobStatus {
        match self {
            JobView::Pending { .. } => JobStatus::Pending,
            JobView::Running { .. } => JobStatus::Running,
            JobView::Completed { .. } => JobStatus::Completed,
            JobView::Error { .. } => JobStatus::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_serializes_with_status_tag() {
        let view = JobView::Running {
            step: "Parsing exported rows...".to_string(),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["step"], "Parsing exported rows...");

        let error = JobView::Error {
            error: "export failed: resource not found".to_string(),
        };
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json.get("step").is_none());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Error.is_terminal());
        assert_eq!(JobStatus::Running.to_string(), "running");
    }
}
