//! Configuration for the upload client.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::retry::RetryConfig;

/// Placeholder some deployments put in the URL field to mean "no upload".
const UNSET_URL_PLACEHOLDER: &str = "n/a";

/// Remote target and transfer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Site URL, e.g. `https://contoso.sharepoint.com/sites/reports`.
    #[serde(default)]
    pub site_url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Destination folder inside the site's default drive.
    #[serde(default = "default_folder_path")]
    pub folder_path: String,

    /// Public client id used for the password grant.
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Tenant override. Derived from the site host when absent.
    #[serde(default)]
    pub tenant: Option<String>,

    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,

    #[serde(default = "default_authority_url")]
    pub authority_url: String,

    /// Files up to this size use a single PUT.
    #[serde(default = "default_simple_upload_limit")]
    pub simple_upload_limit_bytes: u64,

    /// Chunk size for session uploads.
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Timeout for a single chunk PUT.
    #[serde(default = "default_chunk_timeout_secs")]
    pub chunk_timeout_secs: u64,

    #[serde(default = "RetryConfig::upload")]
    pub retry: RetryConfig,
}

fn default_folder_path() -> String {
    "ERF Reporting_Data Analytics & Power BI".to_string()
}

fn default_client_id() -> String {
    // Microsoft Graph PowerShell public client
    "14d82eec-204b-4c2f-b7e8-296a70dab67e".to_string()
}

fn default_graph_base_url() -> String {
    "https://graph.microsoft.com/v1.0".to_string()
}

fn default_authority_url() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_simple_upload_limit() -> u64 {
    4 * 1024 * 1024
}

fn default_chunk_size() -> u64 {
    10 * 1024 * 1024
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_chunk_timeout_secs() -> u64 {
    300
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            site_url: String::new(),
            username: String::new(),
            password: String::new(),
            folder_path: default_folder_path(),
            client_id: default_client_id(),
            tenant: None,
            graph_base_url: default_graph_base_url(),
            authority_url: default_authority_url(),
            simple_upload_limit_bytes: default_simple_upload_limit(),
            chunk_size_bytes: default_chunk_size(),
            request_timeout_secs: default_request_timeout_secs(),
            chunk_timeout_secs: default_chunk_timeout_secs(),
            retry: RetryConfig::upload(),
        }
    }
}

impl UploadConfig {
    /// Creates a config for a site with credentials.
    pub fn new(
        site_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            site_url: site_url.into(),
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Points both the Graph API and the token authority at other hosts.
    pub fn with_endpoints(
        mut self,
        graph_base_url: impl Into<String>,
        authority_url: impl Into<String>,
    ) -> Self {
        self.graph_base_url = graph_base_url.into();
        self.authority_url = authority_url.into();
        self
    }

    /// Sets the size threshold and chunk size.
    pub fn with_transfer_sizes(mut self, simple_upload_limit: u64, chunk_size: u64) -> Self {
        self.simple_upload_limit_bytes = simple_upload_limit;
        self.chunk_size_bytes = chunk_size;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// URL, username and password are all present and the URL is not a
    /// placeholder.
    pub fn is_configured(&self) -> bool {
        let url = self.site_url.trim();
        !url.is_empty()
            && !url.eq_ignore_ascii_case(UNSET_URL_PLACEHOLDER)
            && !self.username.trim().is_empty()
            && !self.password.is_empty()
    }

    /// Parses the site URL into `(host, site path)`.
    pub fn site_parts(&self) -> Option<(String, String)> {
        let url = Url::parse(self.site_url.trim()).ok()?;
        let host = url.host_str()?.to_string();
        let path = url.path().trim_matches('/').to_string();
        Some((host, path))
    }

    /// Tenant used by the primary token flow.
    pub fn tenant_id(&self) -> String {
        if let Some(tenant) = self.tenant.as_ref().filter(|t| !t.trim().is_empty()) {
            return tenant.clone();
        }
        match self.site_parts() {
            Some((host, _)) if host.ends_with(".sharepoint.com") => {
                let org = host.split('.').next().unwrap_or_default();
                format!("{}.onmicrosoft.com", org)
            }
            _ => "common".to_string(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn chunk_timeout(&self) -> Duration {
        Duration::from_secs(self.chunk_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = UploadConfig::default();
        assert_eq!(config.simple_upload_limit_bytes, 4 * 1024 * 1024);
        assert_eq!(config.chunk_size_bytes, 10 * 1024 * 1024);
        assert_eq!(config.folder_path, "ERF Reporting_Data Analytics & Power BI");
        assert!(!config.is_configured());
    }

    #[test]
    fn test_is_configured() {
        let config = UploadConfig::new("https://contoso.sharepoint.com/sites/r", "me", "pw");
        assert!(config.is_configured());

        assert!(!UploadConfig::new("", "me", "pw").is_configured());
        assert!(!UploadConfig::new("n/A", "me", "pw").is_configured());
        assert!(!UploadConfig::new("https://x.sharepoint.com", "", "pw").is_configured());
        assert!(!UploadConfig::new("https://x.sharepoint.com", "me", "").is_configured());
    }

    #[test]
    fn test_site_parts_and_tenant() {
        let config = UploadConfig::new(
            "https://contoso.sharepoint.com/sites/reports/",
            "me",
            "pw",
        );
        assert_eq!(
            config.site_parts(),
            Some((
                "contoso.sharepoint.com".to_string(),
                "sites/reports".to_string()
            ))
        );
        assert_eq!(config.tenant_id(), "contoso.onmicrosoft.com");

        let mut other = UploadConfig::new("https://files.example.org", "me", "pw");
        assert_eq!(other.tenant_id(), "common");
        other.tenant = Some("example.onmicrosoft.com".to_string());
        assert_eq!(other.tenant_id(), "example.onmicrosoft.com");
    }

    #[test]
    fn test_invalid_site_url() {
        assert_eq!(UploadConfig::new("not a url", "a", "b").site_parts(), None);
    }
}
