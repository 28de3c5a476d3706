use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Google Drive v3 REST base URL
    #[serde(default = "default_drive_api_base")]
    pub drive_api_base: String,

    /// Page size used when listing accessible spreadsheets
    #[serde(default = "default_file_page_size")]
    pub file_page_size: u32,

    /// Timeout for outbound Google API requests
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// File the active service-account credential is persisted to. In-memory only when unset.
    #[serde(default)]
    pub credential_path: Option<String>,

    /// AES-256-GCM key for the persisted credential (base64-encoded, 32 bytes)
    #[serde(default)]
    pub credential_key: Option<String>,

    /// Age after which a job still `pending` is reported as stale
    #[serde(default = "default_stale_job_after_secs")]
    pub stale_job_after_secs: u64,

    /// Seconds between stale-job sweeps; values below 1 are raised to 1
    #[serde(default = "default_watchdog_interval_secs")]
    pub watchdog_interval_secs: u64,

    /// Upper bound on spreadsheets scanned by a single search
    #[serde(default = "default_search_max_spreadsheets")]
    pub search_max_spreadsheets: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_drive_api_base() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_file_page_size() -> u32 {
    50
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_stale_job_after_secs() -> u64 {
    300
}

fn default_watchdog_interval_secs() -> u64 {
    30
}

fn default_search_max_spreadsheets() -> usize {
    10
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn stale_job_after(&self) -> Duration {
        Duration::from_secs(self.stale_job_after_secs)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_secs(self.watchdog_interval_secs.max(1))
    }
}

/// Settings for the `verify-client` binary.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Ceiling after which the poller gives up and reports a liveness error
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// Service-account JSON to upload before verifying
    #[serde(default)]
    pub credential_file: Option<String>,
}

fn default_api_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_poll_timeout_secs() -> u64 {
    120
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_when_unset() {
        let config: AppConfig = envy::from_iter(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.file_page_size, 50);
        assert!(config.credential_path.is_none());
        assert_eq!(config.stale_job_after(), Duration::from_secs(300));
    }

    #[test]
    fn test_zero_watchdog_interval_is_raised() {
        let vars = vec![("WATCHDOG_INTERVAL_SECS".to_string(), "0".to_string())];
        let config: AppConfig = envy::from_iter(vars).unwrap();
        assert_eq!(config.watchdog_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_client_overrides() {
        let vars = vec![
            ("API_BASE_URL".to_string(), "http://console:8080".to_string()),
            ("POLL_INTERVAL_MS".to_string(), "250".to_string()),
        ];
        let config: ClientConfig = envy::from_iter(vars).unwrap();
        assert_eq!(config.api_base_url, "http://console:8080");
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.poll_timeout_secs, 120);
    }
}
