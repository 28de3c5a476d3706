use garde::Validate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const SERVICE_ACCOUNT_TYPE: &str = "service_account";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Google service-account key file, as downloaded from the Cloud console.
#[derive(Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    #[garde(custom(is_service_account))]
    pub key_type: String,

    #[garde(length(min = 1, max = 200))]
    pub project_id: String,

    #[garde(length(min = 1, max = 200))]
    pub private_key_id: String,

    #[garde(custom(is_pem_private_key))]
    pub private_key: String,

    #[garde(length(min = 3, max = 320), custom(is_email_like))]
    pub client_email: String,

    #[serde(default)]
    #[garde(skip)]
    pub client_id: Option<String>,

    #[serde(default = "default_token_uri")]
    #[garde(custom(is_http_url))]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

fn is_service_account(value: &String, _ctx: &()) -> garde::Result {
    if value == SERVICE_ACCOUNT_TYPE {
        Ok(())
    } else {
        Err(garde::Error::new("Invalid service account type"))
    }
}

fn is_pem_private_key(value: &String, _ctx: &()) -> garde::Result {
    let trimmed = value.trim();
    if trimmed.starts_with("-----BEGIN") && trimmed.contains("PRIVATE KEY-----") {
        Ok(())
    } else {
        Err(garde::Error::new("private key is not PEM encoded"))
    }
}

fn is_email_like(value: &String, _ctx: &()) -> garde::Result {
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(garde::Error::new("not an email address")),
    }
}

fn is_http_url(value: &String, _ctx: &()) -> garde::Result {
    if value.starts_with("https://") || value.starts_with("http://") {
        Ok(())
    } else {
        Err(garde::Error::new("not an http(s) URL"))
    }
}

// Key material stays out of logs.
impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Identity fields of the active credential, safe to return to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialSummary {
    pub project_id: String,
    pub client_email: String,
}

impl From<&ServiceAccountKey> for CredentialSummary {
    fn from(key: &ServiceAccountKey) -> Self {
        Self {
            project_id: key.project_id.clone(),
            client_email: key.client_email.clone(),
        }
    }
}
