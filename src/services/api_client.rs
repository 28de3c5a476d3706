//! HTTP client for the console API, used by the `verify-client` binary and
//! the end-to-end tests.

use async_trait::async_trait;
use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::job::{JobStatus, JobView};
use crate::models::verification::{FilesResponse, StartVerifyResponse, UploadResponse};
use crate::services::poller::{JobOutcome, PollError, Poller, StatusSource};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Poll(#[from] PollError),
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct ConsoleClient {
    http: reqwest::Client,
    base_url: String,
}

impl ConsoleClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn upload_credential(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse, ClientError> {
        let form = multipart::Form::new().part(
            "file",
            multipart::Part::bytes(bytes)
                .file_name(file_name.to_string())
                .mime_str("application/json")?,
        );
        let response = self
            .http
            .post(format!("{}/api/upload-sa", self.base_url))
            .multipart(form)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn list_files(&self) -> Result<FilesResponse, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/files", self.base_url))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn start_verification(&self) -> Result<Uuid, ClientError> {
        let response = self
            .http
            .post(format!("{}/api/start-verify", self.base_url))
            .send()
            .await?;
        let body: StartVerifyResponse = decode(response).await?;
        Ok(body.job_id)
    }

    pub async fn status(&self, job_id: Uuid) -> Result<JobView, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/verify-status/{}", self.base_url, job_id))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn cancel(&self, job_id: Uuid) -> Result<JobView, ClientError> {
        let response = self
            .http
            .post(format!("{}/api/cancel-verify/{}", self.base_url, job_id))
            .send()
            .await?;
        decode(response).await
    }

    /// Start a job and poll it to completion.
    ///
    /// Takes `&mut self` so the same client cannot submit another start while
    /// this poll is outstanding.
    pub async fn run_verification(
        &mut self,
        poller: &Poller,
        on_progress: impl FnMut(JobStatus, &str) + Send,
    ) -> Result<(Uuid, JobOutcome), ClientError> {
        let job_id = self.start_verification().await?;
        tracing::info!(job_id = %job_id, "Verification started, polling for status");
        let outcome = poller.wait(&*self, job_id, on_progress).await?;
        Ok((job_id, outcome))
    }
}

#[async_trait]
impl StatusSource for ConsoleClient {
    async fn job_status(&self, job_id: Uuid) -> Result<JobView, PollError> {
        self.status(job_id)
            .await
            .map_err(|e| PollError::Source(e.to_string()))
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
