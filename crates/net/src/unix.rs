//! HTTP/1.1 over snapd's UNIX socket

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::header::{CONTENT_TYPE, HOST};
use hyper_util::rt::TokioIo;
use snapkit_errors::NetworkError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::UnixStream;
use tracing::debug;

use crate::request::{canonical_reason, HttpRequest, RawResponse};
use crate::transport::Transport;

/// Talks to a local daemon over a UNIX domain socket
///
/// Each request opens its own connection, so the transport holds no shared
/// mutable state and is cheap to share between tasks.
#[derive(Debug, Clone)]
pub struct UnixSocketTransport {
    socket_path: PathBuf,
    base_url: String,
    timeout: Duration,
    connect_timeout: Duration,
}

impl UnixSocketTransport {
    #[must_use]
    pub fn new(socket_path: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            socket_path: socket_path.into(),
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }

    #[must_use]
    pub fn with_timeouts(mut self, timeout: Duration, connect_timeout: Duration) -> Self {
        self.timeout = timeout;
        self.connect_timeout = connect_timeout;
        self
    }

    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    async fn connect(&self) -> Result<UnixStream, NetworkError> {
        let path = self.socket_path.display().to_string();
        match tokio::time::timeout(self.connect_timeout, UnixStream::connect(&self.socket_path)).await
        {
            Err(_) => Err(NetworkError::Timeout { url: path }),
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(match e.kind() {
                ErrorKind::NotFound => NetworkError::SocketUnavailable { path },
                ErrorKind::ConnectionRefused => NetworkError::ConnectionRefused(path),
                _ => NetworkError::Io(format!("{path}: {e}")),
            }),
        }
    }

    async fn exchange(&self, request: &HttpRequest) -> Result<RawResponse, NetworkError> {
        let url = request.resolve(&self.base_url)?;
        let target = match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        };
        let host = url.host_str().unwrap_or("localhost").to_string();

        let stream = self.connect().await?;
        let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| NetworkError::RequestFailed(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(error = %e, "unix socket connection closed with error");
            }
        });

        let mut builder = hyper::Request::builder()
            .method(request.method.clone())
            .uri(target)
            .header(HOST, host);
        if request.body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        let outgoing = builder
            .body(Full::new(request.body_bytes()?))
            .map_err(|e| NetworkError::InvalidRequest(e.to_string()))?;

        let response = sender
            .send_request(outgoing)
            .await
            .map_err(|e| NetworkError::RequestFailed(e.to_string()))?;
        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| NetworkError::Io(e.to_string()))?
            .to_bytes();

        Ok(RawResponse {
            status: status.as_u16(),
            reason: status
                .canonical_reason()
                .map_or_else(|| canonical_reason(status.as_u16()), str::to_string),
            body,
        })
    }
}

#[async_trait]
impl Transport for UnixSocketTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: &HttpRequest) -> Result<RawResponse, NetworkError> {
        match tokio::time::timeout(self.timeout, self.exchange(request)).await {
            Ok(result) => result,
            Err(_) => Err(NetworkError::Timeout {
                url: format!("unix:{}{}", self.socket_path.display(), request.display_path()),
            }),
        }
    }
}
