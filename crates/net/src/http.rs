//! HTTP client with connection pooling

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use snapkit_errors::{Error, NetworkError};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::request::{HttpRequest, RawResponse};
use crate::transport::{DownloadResult, Transport};

/// Network client configuration
#[derive(Debug, Clone)]
pub struct NetConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: format!("snapkit/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Pooled TCP transport used for the store and for a TCP bridge to snapd
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a new transport
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to initialize.
    pub fn new(base_url: impl Into<String>, config: &NetConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| NetworkError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Create with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created with default settings.
    pub fn with_defaults(base_url: impl Into<String>) -> Result<Self, Error> {
        Self::new(base_url, &NetConfig::default())
    }

    fn build(&self, request: &HttpRequest) -> Result<reqwest::RequestBuilder, NetworkError> {
        let url = request.resolve(&self.base_url)?;
        let mut builder = self.client.request(request.method.clone(), url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        Ok(builder)
    }

    /// Get the underlying reqwest client for advanced usage
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Classify a reqwest failure
fn map_reqwest_error(e: &reqwest::Error) -> NetworkError {
    if e.is_timeout() {
        NetworkError::Timeout {
            url: e
                .url()
                .map(std::string::ToString::to_string)
                .unwrap_or_default(),
        }
    } else if e.is_connect() {
        NetworkError::ConnectionRefused(e.to_string())
    } else if e.is_builder() {
        NetworkError::InvalidRequest(e.to_string())
    } else if e.is_body() || e.is_decode() {
        NetworkError::Io(e.to_string())
    } else {
        NetworkError::RequestFailed(e.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: &HttpRequest) -> Result<RawResponse, NetworkError> {
        let response = self
            .build(request)?
            .send()
            .await
            .map_err(|e| map_reqwest_error(&e))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| map_reqwest_error(&e))?;
        Ok(RawResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            body,
        })
    }

    /// Streams the body to disk chunk by chunk
    async fn download(&self, request: &HttpRequest, dest: &Path) -> Result<DownloadResult, Error> {
        let response = self
            .build(request)?
            .send()
            .await
            .map_err(|e| map_reqwest_error(&e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(snapkit_errors::ApiError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                body,
            }
            .into());
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| Error::io_with_path(&e, dest))?;
        let mut stream = response.bytes_stream();
        let mut size = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| map_reqwest_error(&e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::io_with_path(&e, dest))?;
            size += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| Error::io_with_path(&e, dest))?;

        Ok(DownloadResult {
            path: dest.to_path_buf(),
            size,
        })
    }
}
