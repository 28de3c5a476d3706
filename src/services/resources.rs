use std::sync::Arc;

use crate::error::AppError;
use crate::models::credential::ServiceAccountKey;
use crate::models::resource::Resource;
use crate::services::credentials::CredentialStore;
use crate::services::drive::SpreadsheetSource;

/// Enumerates spreadsheets visible to the active credential.
#[derive(Clone)]
pub struct ResourceLister {
    credentials: Arc<CredentialStore>,
    source: Arc<dyn SpreadsheetSource>,
}

impl ResourceLister {
    pub fn new(credentials: Arc<CredentialStore>, source: Arc<dyn SpreadsheetSource>) -> Self {
        Self {
            credentials,
            source,
        }
    }

    /// Order is whatever the provider returns and may differ between calls.
    pub async fn list_accessible(&self) -> Result<Vec<Resource>, AppError> {
        let credential = self.credentials.require_active().await?;
        self.list_with(&credential).await
    }

    /// List using an already captured credential snapshot.
    pub async fn list_with(&self, credential: &ServiceAccountKey) -> Result<Vec<Resource>, AppError> {
        self.source
            .list_spreadsheets(credential)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Listing spreadsheets failed");
                AppError::Upstream(e)
            })
    }

    pub fn source(&self) -> &Arc<dyn SpreadsheetSource> {
        &self.source
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }
}
