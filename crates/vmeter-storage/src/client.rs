//! Supabase storage client.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use vmeter_models::{storage_object_path, UploadedVideo};

use crate::error::{StorageError, StorageResult};

/// Bucket used when `STORAGE_BUCKET` is not set.
pub const DEFAULT_BUCKET: &str = "videos";

/// Destination for uploaded videos.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Store a video under `videos/{file_name}` and return its public URL.
    async fn upload(&self, file_name: &str, data: Bytes, content_type: &str) -> StorageResult<UploadedVideo>;

    /// Public URL for a stored file name.
    fn public_url(&self, file_name: &str) -> String;
}

/// Configuration for the storage client.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Project base URL
    pub base_url: String,
    /// Service key
    pub api_key: String,
    /// Bucket name
    pub bucket: String,
    /// Upload timeout
    pub timeout: Duration,
}

impl StorageConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            bucket: bucket.into(),
            timeout: Duration::from_secs(300),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let base_url = std::env::var("SUPABASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| StorageError::config_error("SUPABASE_URL not set"))?;
        url::Url::parse(base_url.trim())
            .map_err(|e| StorageError::config_error(format!("SUPABASE_URL is invalid: {}", e)))?;
        let api_key = std::env::var("SUPABASE_SERVICE_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| StorageError::config_error("SUPABASE_SERVICE_KEY not set"))?;
        let bucket = std::env::var("STORAGE_BUCKET")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BUCKET.to_string());

        Ok(Self::new(base_url.trim(), api_key.trim(), bucket))
    }
}

/// Supabase storage client for one bucket.
#[derive(Clone)]
pub struct StorageClient {
    http: Client,
    config: StorageConfig,
}

impl StorageClient {
    pub fn new(config: StorageConfig) -> StorageResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("vmeter-storage/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(StorageError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Self::new(StorageConfig::from_env()?)
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    fn encoded_object_path(file_name: &str) -> String {
        storage_object_path(&urlencoding::encode(file_name))
    }

    fn upload_url(&self, file_name: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.config.base_url,
            self.config.bucket,
            Self::encoded_object_path(file_name)
        )
    }
}

#[async_trait]
impl VideoStore for StorageClient {
    async fn upload(&self, file_name: &str, data: Bytes, content_type: &str) -> StorageResult<UploadedVideo> {
        if file_name.is_empty() || file_name.contains('/') {
            return Err(StorageError::InvalidKey(file_name.to_string()));
        }

        let url = self.upload_url(file_name);
        let size = data.len();
        debug!("Uploading {} bytes to {}", size, url);

        let response = self
            .http
            .post(&url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Duplicate objects come back as 409, or 400 with a Duplicate body
            if status == StatusCode::CONFLICT || body.contains("Duplicate") {
                return Err(StorageError::AlreadyExists(storage_object_path(file_name)));
            }
            return Err(StorageError::upload_failed(format!("{} returned {}: {}", url, status, body)));
        }

        let public = self.public_url(file_name);
        info!(file_name, bytes = size, bucket = %self.config.bucket, "Uploaded video");

        Ok(UploadedVideo {
            success: true,
            url: public,
            file_name: file_name.to_string(),
        })
    }

    fn public_url(&self, file_name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.base_url,
            self.config.bucket,
            Self::encoded_object_path(file_name)
        )
    }
}
