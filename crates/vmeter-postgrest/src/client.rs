//! PostgREST REST client.
//!
//! Thin wrapper over reqwest that adds:
//! - `apikey` and bearer auth on every request
//! - Connection pooling and timeouts
//! - Tracing spans and request metrics
//! - Opt-in retry for idempotent calls

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info_span, Instrument};

use crate::error::{PostgrestError, PostgrestResult};
use crate::metrics::record_request;
use crate::retry::RetryConfig;

/// Query parameters for a PostgREST request (`column=op.value` filters etc).
pub type Params = Vec<(String, String)>;

// =============================================================================
// Configuration
// =============================================================================

/// PostgREST client configuration.
#[derive(Debug, Clone)]
pub struct PostgrestConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`
    pub base_url: String,
    /// Service or anon key, sent as `apikey` and bearer token
    pub api_key: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl PostgrestConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> PostgrestResult<Self> {
        let base_url = non_empty_env("SUPABASE_URL")
            .ok_or_else(|| PostgrestError::not_configured("SUPABASE_URL must be set"))?;
        check_base_url(&base_url)?;

        let api_key = non_empty_env("SUPABASE_SERVICE_KEY")
            .or_else(|| non_empty_env("SUPABASE_ANON_KEY"))
            .ok_or_else(|| {
                PostgrestError::not_configured("SUPABASE_SERVICE_KEY or SUPABASE_ANON_KEY must be set")
            })?;

        let connect_timeout_secs: u64 = std::env::var("POSTGREST_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
            ..Self::new(base_url, api_key)
        })
    }
}

/// Reject base URLs reqwest could never reach.
fn check_base_url(base_url: &str) -> PostgrestResult<()> {
    let parsed = url::Url::parse(base_url)
        .map_err(|e| PostgrestError::not_configured(format!("SUPABASE_URL is invalid: {}", e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(PostgrestError::not_configured(format!(
            "SUPABASE_URL must be http or https, got {}",
            parsed.scheme()
        )));
    }
    Ok(())
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

// =============================================================================
// Client
// =============================================================================

/// PostgREST client for one project.
#[derive(Clone)]
pub struct PostgrestClient {
    http: Client,
    config: PostgrestConfig,
    rest_url: String,
}

impl std::fmt::Debug for PostgrestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgrestClient")
            .field("rest_url", &self.rest_url)
            .finish_non_exhaustive()
    }
}

impl PostgrestClient {
    /// Create a new client.
    pub fn new(config: PostgrestConfig) -> PostgrestResult<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| PostgrestError::not_configured("API key contains invalid header characters"))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| PostgrestError::not_configured("API key contains invalid header characters"))?;
        headers.insert("apikey", key);
        headers.insert(reqwest::header::AUTHORIZATION, bearer);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("vmeter-postgrest/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(PostgrestError::Network)?;

        let rest_url = format!("{}/rest/v1", config.base_url);

        Ok(Self { http, config, rest_url })
    }

    /// Create from environment variables.
    pub fn from_env() -> PostgrestResult<Self> {
        Self::new(PostgrestConfig::from_env()?)
    }

    pub fn config(&self) -> &PostgrestConfig {
        &self.config
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    /// Execute an operation with the configured retry policy.
    pub async fn with_retry<T, F, Fut>(&self, operation: &str, op: F) -> PostgrestResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = PostgrestResult<T>>,
    {
        crate::retry::with_retry(&self.config.retry, operation, op).await
    }

    // =========================================================================
    // Row operations
    // =========================================================================

    /// `GET /{table}?{params}`
    pub async fn select<T: DeserializeOwned>(&self, table: &str, params: &Params) -> PostgrestResult<Vec<T>> {
        let url = self.table_url(table);
        self.execute_request("select", table, async {
            let response = self.http.get(&url).query(params).send().await?;
            Self::read_rows(response, &url).await
        })
        .await
    }

    /// `POST /{table}` returning the inserted rows.
    pub async fn insert<B, T>(&self, table: &str, body: &B) -> PostgrestResult<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.table_url(table);
        self.execute_request("insert", table, async {
            let request = Self::representation(self.http.post(&url)).json(body);
            Self::read_rows(request.send().await?, &url).await
        })
        .await
    }

    /// `PATCH /{table}?{params}` returning the updated rows.
    pub async fn update<B, T>(&self, table: &str, params: &Params, body: &B) -> PostgrestResult<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.table_url(table);
        self.execute_request("update", table, async {
            let request = Self::representation(self.http.patch(&url)).query(params).json(body);
            Self::read_rows(request.send().await?, &url).await
        })
        .await
    }

    /// `DELETE /{table}?{params}` returning the deleted rows.
    pub async fn delete<T: DeserializeOwned>(&self, table: &str, params: &Params) -> PostgrestResult<Vec<T>> {
        let url = self.table_url(table);
        self.execute_request("delete", table, async {
            let request = Self::representation(self.http.delete(&url)).query(params);
            Self::read_rows(request.send().await?, &url).await
        })
        .await
    }

    fn representation(request: RequestBuilder) -> RequestBuilder {
        request.header("Prefer", "return=representation")
    }

    async fn read_rows<T: DeserializeOwned>(response: reqwest::Response, url: &str) -> PostgrestResult<Vec<T>> {
        let status = response.status();
        match status {
            StatusCode::OK | StatusCode::CREATED => {
                let body = response.text().await?;
                serde_json::from_str(&body).map_err(|e| {
                    PostgrestError::InvalidResponse(format!("{} returned unexpected body: {}", url, e))
                })
            }
            StatusCode::NO_CONTENT => Ok(Vec::new()),
            _ => Err(Self::handle_error_response(status, url, response).await),
        }
    }

    async fn execute_request<T, F>(&self, operation: &str, table: &str, fut: F) -> PostgrestResult<T>
    where
        F: std::future::Future<Output = PostgrestResult<T>>,
    {
        let span = info_span!("postgrest_request", operation = %operation, table = %table);

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);
        debug!(operation, table, status, latency_ms, "PostgREST request finished");

        result
    }

    async fn handle_error_response(status: StatusCode, url: &str, response: reqwest::Response) -> PostgrestError {
        let retry_after_ms = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|secs| secs.saturating_mul(1000));
        let body = response.text().await.unwrap_or_default();
        PostgrestError::from_http_parts(status.as_u16(), retry_after_ms, format!("{} failed: {}", url, body))
    }
}
