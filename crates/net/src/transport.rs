use async_trait::async_trait;
use snapkit_errors::{Error, NetworkError};
use std::path::{Path, PathBuf};

use crate::request::{HttpRequest, RawResponse};

/// Bytes written by a completed download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub path: PathBuf,
    pub size: u64,
}

/// One way of getting an [`HttpRequest`] to a server
///
/// `send` yields a response for every status code; only failures to talk to
/// the server at all are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Base URL that relative request paths are joined to
    fn base_url(&self) -> &str;

    async fn send(&self, request: &HttpRequest) -> Result<RawResponse, NetworkError>;

    /// Write the response body for `request` to `dest`
    ///
    /// The default buffers the whole body; transports that can stream
    /// override it.
    ///
    /// # Errors
    ///
    /// Returns a network error if the request fails, `ApiError::Status` for a
    /// non-2xx response, or an I/O error if `dest` cannot be written.
    async fn download(&self, request: &HttpRequest, dest: &Path) -> Result<DownloadResult, Error> {
        let response = self.send(request).await?.error_for_status()?;
        tokio::fs::write(dest, &response.body)
            .await
            .map_err(|e| Error::io_with_path(&e, dest))?;
        Ok(DownloadResult {
            path: dest.to_path_buf(),
            size: response.body.len() as u64,
        })
    }
}
