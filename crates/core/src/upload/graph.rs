//! Microsoft Graph drive uploader.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::io::AsyncReadExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::config::UploadConfig;
use super::error::UploadError;
use super::token::TokenCache;
use super::traits::Uploader;
use super::types::{UploadMode, UploadReceipt, UploadSession};

const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";
const GRAPH_RESOURCE: &str = "https://graph.microsoft.com/";
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

/// Percent-encodes every segment of `folder/file_name`, keeping the slashes.
pub fn encode_drive_path(folder: &str, file_name: &str) -> String {
    folder
        .split('/')
        .filter(|s| !s.is_empty())
        .chain(std::iter::once(file_name))
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// The legacy endpoint sends this as a string.
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

impl TokenResponse {
    fn lifetime(&self) -> Duration {
        let secs = match &self.expires_in {
            Some(serde_json::Value::Number(n)) => n.as_u64(),
            Some(serde_json::Value::String(s)) => s.parse().ok(),
            _ => None,
        };
        Duration::from_secs(secs.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS))
    }
}

#[derive(Debug, Deserialize)]
struct SiteResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    upload_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveItem {
    id: Option<String>,
    web_url: Option<String>,
}

/// Uploads through the Graph `drive/root:/path:` addressing scheme.
pub struct GraphUploader {
    config: UploadConfig,
    client: Client,
    tokens: Arc<RwLock<TokenCache>>,
}

impl GraphUploader {
    pub fn new(config: UploadConfig) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| UploadError::Network(e.to_string()))?;

        Ok(Self {
            config,
            client,
            tokens: Arc::new(RwLock::new(TokenCache::default())),
        })
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Returns a cached token or fetches a new one, trying the legacy flow
    /// when the primary one fails.
    async fn access_token(&self) -> Result<String, UploadError> {
        {
            let cache = self.tokens.read().await;
            if let Some(token) = cache.get(Instant::now()) {
                return Ok(token.to_string());
            }
        }

        let response = match self.primary_token().await {
            Ok(response) => response,
            Err(primary) => {
                warn!(
                    "Primary token flow failed ({}), falling back to legacy endpoint",
                    primary
                );
                self.legacy_token()
                    .await
                    .map_err(|fallback| UploadError::Authentication {
                        reason: format!("primary: {}; fallback: {}", primary, fallback),
                    })?
            }
        };

        let lifetime = response.lifetime();
        let mut cache = self.tokens.write().await;
        cache.store(response.access_token.clone(), lifetime, Instant::now());
        debug!("Obtained access token valid for {:?}", lifetime);
        Ok(response.access_token)
    }

    /// Drops the cached token when the API rejected it, so the next attempt
    /// authenticates again.
    async fn forget_rejected_token<T>(
        &self,
        result: Result<T, UploadError>,
    ) -> Result<T, UploadError> {
        if let Err(UploadError::Api { status: 401, .. }) = &result {
            warn!("Access token rejected by the API, clearing token cache");
            self.tokens.write().await.clear();
        }
        result
    }

    async fn primary_token(&self) -> Result<TokenResponse, UploadError> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.config.authority_url.trim_end_matches('/'),
            self.config.tenant_id()
        );
        self.request_token(
            &url,
            &[
                ("grant_type", "password"),
                ("client_id", self.config.client_id.as_str()),
                ("username", self.config.username.as_str()),
                ("password", self.config.password.as_str()),
                ("scope", GRAPH_SCOPE),
            ],
        )
        .await
    }

    async fn legacy_token(&self) -> Result<TokenResponse, UploadError> {
        let url = format!(
            "{}/common/oauth2/token",
            self.config.authority_url.trim_end_matches('/')
        );
        self.request_token(
            &url,
            &[
                ("grant_type", "password"),
                ("client_id", self.config.client_id.as_str()),
                ("username", self.config.username.as_str()),
                ("password", self.config.password.as_str()),
                ("resource", GRAPH_RESOURCE),
            ],
        )
        .await
    }

    async fn request_token(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, UploadError> {
        let response = self.client.post(url).form(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::api(status.as_u16(), &body));
        }
        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))
    }

    fn graph_url(&self, suffix: &str) -> String {
        format!(
            "{}/{}",
            self.config.graph_base_url.trim_end_matches('/'),
            suffix.trim_start_matches('/')
        )
    }

    async fn site_id(&self, token: &str) -> Result<String, UploadError> {
        let (host, site_path) = self
            .config
            .site_parts()
            .ok_or_else(|| UploadError::InvalidSiteUrl {
                url: self.config.site_url.clone(),
            })?;

        let url = if site_path.is_empty() {
            self.graph_url(&format!("sites/{}", host))
        } else {
            self.graph_url(&format!("sites/{}:/{}", host, site_path))
        };

        let response = self.client.get(&url).bearer_auth(token).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::api(status.as_u16(), &body));
        }

        let site: SiteResponse = response
            .json()
            .await
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;
        debug!("Resolved site {} to id {}", self.config.site_url, site.id);
        Ok(site.id)
    }

    fn item_url(&self, site_id: &str, file_name: &str, action: &str) -> String {
        self.graph_url(&format!(
            "sites/{}/drive/root:/{}:/{}",
            site_id,
            encode_drive_path(&self.config.folder_path, file_name),
            action
        ))
    }

    async fn upload_simple(
        &self,
        token: &str,
        site_id: &str,
        path: &Path,
        file_name: &str,
    ) -> Result<DriveItem, UploadError> {
        let content = tokio::fs::read(path).await?;
        let url = self.item_url(site_id, file_name, "content");

        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(content)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::api(status.as_u16(), &body));
        }
        Ok(response.json().await.unwrap_or_default())
    }

    async fn create_session(
        &self,
        token: &str,
        site_id: &str,
        file_name: &str,
    ) -> Result<String, UploadError> {
        let url = self.item_url(site_id, file_name, "createUploadSession");
        let body = json!({
            "item": { "@microsoft.graph.conflictBehavior": "replace" }
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::api(status.as_u16(), &body));
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;
        session
            .upload_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| UploadError::InvalidResponse("upload session without uploadUrl".into()))
    }

    async fn upload_chunked(
        &self,
        token: &str,
        site_id: &str,
        path: &Path,
        file_name: &str,
        size: u64,
    ) -> Result<(DriveItem, u32), UploadError> {
        let upload_url = self.create_session(token, site_id, file_name).await?;
        let mut session = UploadSession::new(upload_url, size, self.config.chunk_size_bytes);
        let mut file = tokio::fs::File::open(path).await?;
        let mut chunks = 0u32;
        let mut item = DriveItem::default();

        info!(
            "Upload session created for {} ({} bytes, {} byte chunks)",
            file_name, size, session.chunk_size
        );

        while let Some(range) = session.next_range() {
            let mut buffer = vec![0u8; range.len() as usize];
            file.read_exact(&mut buffer).await?;

            // Session URLs are pre-authorised; no bearer header.
            let response = self
                .client
                .put(&session.upload_url)
                .timeout(self.config.chunk_timeout())
                .header(reqwest::header::CONTENT_RANGE, range.content_range_header())
                .body(buffer)
                .send()
                .await?;

            let status = response.status();
            if !matches!(status.as_u16(), 200 | 201 | 202) {
                warn!(
                    "Chunk {} rejected with {}, abandoning session",
                    range.content_range_header(),
                    status
                );
                return Err(UploadError::ChunkRejected {
                    status: status.as_u16(),
                    range: range.content_range_header(),
                });
            }

            session.advance(range.len())?;
            chunks += 1;
            debug!(
                "Uploaded {} ({}/{} bytes)",
                range.content_range_header(),
                session.bytes_uploaded(),
                size
            );

            if session.is_complete() {
                item = response.json().await.unwrap_or_default();
            }
        }

        Ok((item, chunks))
    }
}

#[async_trait]
impl Uploader for GraphUploader {
    fn name(&self) -> &str {
        "graph"
    }

    async fn upload(&self, path: &Path) -> Result<UploadReceipt, UploadError> {
        if !self.config.is_configured() {
            return Err(UploadError::NotConfigured);
        }
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| UploadError::FileNotFound {
                path: path.to_path_buf(),
            })?;
        let size = metadata.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| UploadError::FileNotFound {
                path: path.to_path_buf(),
            })?;

        let start = Instant::now();
        let token = self.access_token().await?;
        let site_id = self
            .forget_rejected_token(self.site_id(&token).await)
            .await?;

        let (item, mode, chunks) = if size <= self.config.simple_upload_limit_bytes {
            let item = self
                .forget_rejected_token(
                    self.upload_simple(&token, &site_id, path, &file_name)
                        .await,
                )
                .await?;
            (item, UploadMode::Simple, 1)
        } else {
            let (item, chunks) = self
                .forget_rejected_token(
                    self.upload_chunked(&token, &site_id, path, &file_name, size)
                        .await,
                )
                .await?;
            (item, UploadMode::Session, chunks)
        };

        let remote_path = format!(
            "{}/{}",
            self.config.folder_path.trim_matches('/'),
            file_name
        );
        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Uploaded {} to {} ({} bytes, {} mode) in {}ms",
            path.display(),
            remote_path,
            size,
            mode.as_str(),
            duration_ms
        );

        Ok(UploadReceipt {
            file_name,
            remote_path,
            size,
            mode,
            chunks,
            item_id: item.id,
            web_url: item.web_url,
            duration_ms,
        })
    }

    async fn test_connection(&self) -> Result<(), UploadError> {
        if !self.config.is_configured() {
            return Err(UploadError::NotConfigured);
        }
        let token = self.access_token().await?;
        let site_id = self
            .forget_rejected_token(self.site_id(&token).await)
            .await?;

        let folder = self.config.folder_path.trim_matches('/');
        if !folder.is_empty() {
            let encoded = folder
                .split('/')
                .map(|s| urlencoding::encode(s).into_owned())
                .collect::<Vec<_>>()
                .join("/");
            let url = self.graph_url(&format!("sites/{}/drive/root:/{}", site_id, encoded));
            let response = self.client.get(&url).bearer_auth(&token).send().await?;
            if response.status() != StatusCode::OK {
                warn!(
                    "Target folder '{}' may not exist (status {})",
                    folder,
                    response.status()
                );
            }
        }

        info!("Upload target {} is reachable", self.config.site_url);
        Ok(())
    }
}
