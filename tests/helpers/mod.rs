//! Test helper utilities: an in-memory spreadsheet source and request helpers

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::sleep;
use tower::ServiceExt;

use sheets_verify::app_state::AppState;
use sheets_verify::models::credential::ServiceAccountKey;
use sheets_verify::models::resource::{ExportFormat, ExportTicket, Resource};
use sheets_verify::routes;
use sheets_verify::services::credentials::CredentialStore;
use sheets_verify::services::drive::{SourceError, SpreadsheetSource};

pub const BOUNDARY: &str = "sheets-verify-test-boundary";

/// In-memory stand-in for Google Drive. A sheet without content behaves as
/// if it was deleted after being listed.
#[derive(Default)]
pub struct FakeSource {
    sheets: Mutex<Vec<(Resource, Option<String>)>>,
    fail_listing: AtomicBool,
    export_gate: Option<Arc<Notify>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(self, id: &str, name: &str, csv: &str) -> Self {
        self.sheets
            .lock()
            .unwrap()
            .push((resource(id, name), Some(csv.to_string())));
        self
    }

    pub fn with_deleted_sheet(self, id: &str, name: &str) -> Self {
        self.sheets.lock().unwrap().push((resource(id, name), None));
        self
    }

    /// Every export waits for one `notify_one` on `gate`.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.export_gate = Some(gate);
        self
    }

    pub fn failing_listing(self) -> Self {
        self.fail_listing.store(true, Ordering::SeqCst);
        self
    }
}

fn resource(id: &str, name: &str) -> Resource {
    Resource {
        id: id.to_string(),
        name: name.to_string(),
        mime_type: Some("application/vnd.google-apps.spreadsheet".to_string()),
        modified_time: None,
    }
}

#[async_trait]
impl SpreadsheetSource for FakeSource {
    async fn list_spreadsheets(
        &self,
        _credential: &ServiceAccountKey,
    ) -> Result<Vec<Resource>, SourceError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(SourceError::Status {
                status: 503,
                message: "backend unavailable".to_string(),
            });
        }
        Ok(self
            .sheets
            .lock()
            .unwrap()
            .iter()
            .map(|(resource, _)| resource.clone())
            .collect())
    }

    async fn request_export(
        &self,
        _credential: &ServiceAccountKey,
        resource: &Resource,
        format: ExportFormat,
    ) -> Result<ExportTicket, SourceError> {
        if let Some(gate) = &self.export_gate {
            gate.notified().await;
        }
        let exists = self
            .sheets
            .lock()
            .unwrap()
            .iter()
            .any(|(r, content)| r.id == resource.id && content.is_some());
        if !exists {
            return Err(SourceError::NotFound);
        }
        Ok(ExportTicket {
            resource_id: resource.id.clone(),
            file_name: resource.name.clone(),
            format,
            download_url: format!("memory://{}", resource.id),
        })
    }

    async fn download(
        &self,
        _credential: &ServiceAccountKey,
        ticket: &ExportTicket,
    ) -> Result<Vec<u8>, SourceError> {
        self.sheets
            .lock()
            .unwrap()
            .iter()
            .find(|(r, _)| r.id == ticket.resource_id)
            .and_then(|(_, content)| content.clone())
            .map(String::into_bytes)
            .ok_or(SourceError::NotFound)
    }
}

pub fn test_state(source: FakeSource) -> AppState {
    test_state_with_stale_after(source, Duration::from_secs(300))
}

/// State whose health check treats pending jobs older than `stale_after` as stuck.
pub fn test_state_with_stale_after(source: FakeSource, stale_after: Duration) -> AppState {
    AppState::new(
        CredentialStore::in_memory(),
        Arc::new(source),
        10,
        stale_after,
    )
}

pub fn app(state: &AppState) -> Router {
    routes::api_router(state.clone())
}

/// Send a request and decode the JSON body.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Multipart request for POST /api/upload-sa with `bytes` in field `field`.
pub fn upload_request(field: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/json\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/upload-sa")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Poll GET /api/verify-status/{job_id} until the job is terminal (with timeout)
pub async fn poll_until_terminal(app: &Router, job_id: &str) -> Value {
    for _ in 0..200 {
        let (status, body) = send(app, get(&format!("/api/verify-status/{job_id}"))).await;
        assert_eq!(status, StatusCode::OK, "status check failed: {body}");
        match body["status"].as_str() {
            Some("completed") | Some("error") => return body,
            Some("pending") | Some("running") => sleep(Duration::from_millis(10)).await,
            other => panic!("Unknown job status: {other:?}"),
        }
    }
    panic!("Job {job_id} did not finish in time");
}
