use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::credential::CredentialSummary;
use crate::models::job::JobView;
use crate::models::resource::Resource;

/// Response after a service-account upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub project_id: String,
    pub client_email: String,
}

impl From<CredentialSummary> for UploadResponse {
    fn from(summary: CredentialSummary) -> Self {
        Self {
            success: true,
            message: "Service account uploaded successfully".to_string(),
            project_id: summary.project_id,
            client_email: summary.client_email,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilesResponse {
    pub count: usize,
    pub files: Vec<Resource>,
}

/// Response after starting a verification job.
#[derive(Debug, Serialize, Deserialize)]
pub struct StartVerifyResponse {
    pub job_id: Uuid,
    pub status: String,
}

/// Response for querying job status.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    #[serde(flatten)]
    pub view: JobView,
}
