//! Single-slot store for the active service-account credential.
//!
//! Readers always observe either the previous or the new credential: the
//! slot holds an `Arc` that is swapped under a write lock only after the
//! upload has been fully validated (and persisted, when configured).

use garde::Validate;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::models::credential::{CredentialSummary, ServiceAccountKey, SERVICE_ACCOUNT_TYPE};
use crate::services::encryption::CredentialCipher;

const REQUIRED_FIELDS: [&str; 5] = [
    "type",
    "project_id",
    "private_key_id",
    "private_key",
    "client_email",
];

/// Where the active credential is written so it survives restarts.
pub struct CredentialVault {
    path: PathBuf,
    cipher: Option<CredentialCipher>,
}

impl CredentialVault {
    pub fn new(path: impl Into<PathBuf>, cipher: Option<CredentialCipher>) -> Self {
        Self {
            path: path.into(),
            cipher,
        }
    }

    async fn save(&self, key: &ServiceAccountKey) -> Result<(), AppError> {
        let plain = serde_json::to_vec(key)
            .map_err(|e| AppError::Internal(format!("failed to encode credential: {e}")))?;
        let bytes = match &self.cipher {
            Some(cipher) => cipher
                .seal(&plain)
                .map_err(|e| AppError::Internal(e.to_string()))?,
            None => plain,
        };

        // Write next to the target and rename so a crash never leaves a torn file.
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| AppError::Internal(format!("failed to persist credential: {e}")))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| AppError::Internal(format!("failed to persist credential: {e}")))?;
        Ok(())
    }

    async fn load(&self) -> Result<Option<ServiceAccountKey>, AppError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::Internal(format!(
                    "failed to read persisted credential: {e}"
                )))
            }
        };
        let sealed = CredentialCipher::is_sealed(&bytes);
        let plain = match &self.cipher {
            Some(cipher) if sealed => cipher
                .open(&bytes)
                .map_err(|e| AppError::Internal(e.to_string()))?,
            Some(_) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "Persisted credential is not encrypted; it will be sealed on the next upload"
                );
                bytes
            }
            None if sealed => {
                return Err(AppError::Internal(
                    "persisted credential is sealed but CREDENTIAL_KEY is not set".to_string(),
                ))
            }
            None => bytes,
        };
        parse_service_account(&plain).map(Some)
    }
}

/// Holds at most one active credential; last successful upload wins.
pub struct CredentialStore {
    active: RwLock<Option<Arc<ServiceAccountKey>>>,
    vault: Option<CredentialVault>,
}

impl CredentialStore {
    pub fn in_memory() -> Self {
        Self {
            active: RwLock::new(None),
            vault: None,
        }
    }

    /// Create a store backed by `vault`, restoring any previously persisted credential.
    pub async fn with_vault(vault: CredentialVault) -> Self {
        let restored = match vault.load().await {
            Ok(Some(key)) => {
                tracing::info!(
                    project_id = %key.project_id,
                    client_email = %key.client_email,
                    "Restored persisted service account"
                );
                Some(Arc::new(key))
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable persisted credential");
                None
            }
        };

        Self {
            active: RwLock::new(restored),
            vault: Some(vault),
        }
    }

    /// Validate an uploaded key file and make it the active credential.
    ///
    /// On any failure the previously active credential is left untouched.
    pub async fn upload(&self, file_bytes: &[u8]) -> Result<CredentialSummary, AppError> {
        let key = parse_service_account(file_bytes)?;
        let summary = CredentialSummary::from(&key);

        // Holding the slot across the save keeps disk and memory on the same winner.
        let mut slot = self.active.write().await;
        if let Some(vault) = &self.vault {
            vault.save(&key).await?;
        }
        *slot = Some(Arc::new(key));
        drop(slot);

        tracing::info!(
            project_id = %summary.project_id,
            client_email = %summary.client_email,
            "Service account uploaded"
        );
        Ok(summary)
    }

    /// Snapshot of the active credential. Jobs hold on to the returned `Arc`.
    pub async fn active(&self) -> Option<Arc<ServiceAccountKey>> {
        self.active.read().await.clone()
    }

    pub async fn require_active(&self) -> Result<Arc<ServiceAccountKey>, AppError> {
        self.active().await.ok_or(AppError::NoCredential)
    }
}

/// Parse and validate service-account JSON.
pub fn parse_service_account(bytes: &[u8]) -> Result<ServiceAccountKey, AppError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|_| AppError::InvalidCredential("Invalid JSON file".to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| AppError::InvalidCredential("Invalid JSON file".to_string()))?;

    for field in REQUIRED_FIELDS {
        if !object.contains_key(field) {
            return Err(AppError::InvalidCredential(format!(
                "Missing required field: {field}"
            )));
        }
    }

    if object.get("type").and_then(|t| t.as_str()) != Some(SERVICE_ACCOUNT_TYPE) {
        return Err(AppError::InvalidCredential(
            "Invalid service account type".to_string(),
        ));
    }

    let key: ServiceAccountKey = serde_json::from_value(value)
        .map_err(|e| AppError::InvalidCredential(format!("Invalid service account: {e}")))?;

    key.validate()
        .map_err(|report| AppError::InvalidCredential(format!("Invalid service account: {report}")))?;

    Ok(key)
}
