use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::models::credential::ServiceAccountKey;
use crate::models::resource::{ExportFormat, ExportTicket, Resource, SPREADSHEET_MIME_TYPE};
use crate::services::google_auth::{truncate, TokenProvider};

/// Failures talking to the spreadsheet provider.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("resource not found")]
    NotFound,

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("no {0} export available for this file")]
    ExportUnavailable(String),
}

/// Provider of spreadsheets and their tabular exports.
#[async_trait]
pub trait SpreadsheetSource: Send + Sync {
    /// Spreadsheets readable by `credential`, in provider order.
    async fn list_spreadsheets(
        &self,
        credential: &ServiceAccountKey,
    ) -> Result<Vec<Resource>, SourceError>;

    /// Ask the provider for an export of `resource` in `format`.
    async fn request_export(
        &self,
        credential: &ServiceAccountKey,
        resource: &Resource,
        format: ExportFormat,
    ) -> Result<ExportTicket, SourceError>;

    /// Fetch the bytes of a previously requested export.
    async fn download(
        &self,
        credential: &ServiceAccountKey,
        ticket: &ExportTicket,
    ) -> Result<Vec<u8>, SourceError>;
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    mime_type: Option<String>,
    modified_time: Option<String>,
    #[serde(default)]
    export_links: HashMap<String, String>,
}

impl From<DriveFile> for Resource {
    fn from(file: DriveFile) -> Self {
        Resource {
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            modified_time: file.modified_time,
        }
    }
}

/// Google Drive v3 REST client.
pub struct GoogleDriveClient {
    http: reqwest::Client,
    tokens: TokenProvider,
    base_url: String,
    page_size: u32,
}

impl GoogleDriveClient {
    pub fn new(base_url: &str, page_size: u32, timeout: Duration) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("sheets-verify/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            tokens: TokenProvider::new(http.clone()),
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size,
        })
    }

    async fn get(
        &self,
        credential: &ServiceAccountKey,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Response, SourceError> {
        let token = self.tokens.access_token(credential).await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;
        check_status(response).await
    }
}

async fn check_status(response: Response) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => SourceError::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SourceError::Auth(format!("{}: {}", status.as_u16(), truncate(&body, 200)))
        }
        _ => SourceError::Status {
            status: status.as_u16(),
            message: truncate(&body, 200),
        },
    })
}

#[async_trait]
impl SpreadsheetSource for GoogleDriveClient {
    async fn list_spreadsheets(
        &self,
        credential: &ServiceAccountKey,
    ) -> Result<Vec<Resource>, SourceError> {
        let url = format!("{}/files", self.base_url);
        let query = [
            ("q", format!("mimeType='{SPREADSHEET_MIME_TYPE}'")),
            ("pageSize", self.page_size.to_string()),
            ("fields", "files(id, name, mimeType, modifiedTime)".to_string()),
        ];

        let list: FileList = self.get(credential, &url, &query).await?.json().await?;
        tracing::debug!(count = list.files.len(), "Listed spreadsheets");
        Ok(list.files.into_iter().map(Resource::from).collect())
    }

    async fn request_export(
        &self,
        credential: &ServiceAccountKey,
        resource: &Resource,
        format: ExportFormat,
    ) -> Result<ExportTicket, SourceError> {
        let url = format!("{}/files/{}", self.base_url, resource.id);
        let query = [("fields", "id, name, exportLinks".to_string())];

        let mut file: DriveFile = self.get(credential, &url, &query).await?.json().await?;
        let download_url = file
            .export_links
            .remove(format.as_ref())
            .ok_or_else(|| SourceError::ExportUnavailable(format.label().to_string()))?;

        Ok(ExportTicket {
            resource_id: file.id,
            file_name: file.name,
            format,
            download_url,
        })
    }

    async fn download(
        &self,
        credential: &ServiceAccountKey,
        ticket: &ExportTicket,
    ) -> Result<Vec<u8>, SourceError> {
        let response = self.get(credential, &ticket.download_url, &[]).await?;
        let bytes = response.bytes().await?;
        tracing::debug!(
            resource_id = %ticket.resource_id,
            bytes = bytes.len(),
            "Downloaded export"
        );
        Ok(bytes.to_vec())
    }
}
