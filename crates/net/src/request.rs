//! Transport-independent request and response values

use bytes::Bytes;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use snapkit_errors::{ApiError, Error, NetworkError, ValidationError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::warn;
use url::Url;

/// An HTTP request addressed relative to a transport's base URL
///
/// `url` is either a path such as `/v2/snaps` or, for store download links,
/// an absolute `http(s)://` URL that bypasses the base.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    #[must_use]
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    /// Append a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Attach a JSON body
    ///
    /// # Errors
    ///
    /// Returns a validation error if `body` cannot be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, Error> {
        self.body = Some(serde_json::to_value(body).map_err(|e| {
            ValidationError::InvalidPayload {
                context: "request body".to_string(),
                message: e.to_string(),
            }
        })?);
        Ok(self)
    }

    /// Path used in logs and events; never includes the host
    #[must_use]
    pub fn display_path(&self) -> &str {
        self.url
            .find("://")
            .and_then(|scheme_end| {
                self.url[scheme_end + 3..]
                    .find('/')
                    .map(|i| &self.url[scheme_end + 3 + i..])
            })
            .unwrap_or(&self.url)
    }

    /// Resolve the final URL against `base`
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::InvalidUrl` if the joined URL does not parse.
    pub fn resolve(&self, base: &str) -> Result<Url, NetworkError> {
        let raw = if self.url.starts_with("http://") || self.url.starts_with("https://") {
            self.url.clone()
        } else {
            format!("{}{}", base.trim_end_matches('/'), self.url)
        };
        let mut url = Url::parse(&raw).map_err(|e| NetworkError::InvalidUrl(format!("{raw}: {e}")))?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }

    /// Serialized body bytes, empty when there is no body
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::InvalidRequest` if the body cannot be encoded.
    pub fn body_bytes(&self) -> Result<Bytes, NetworkError> {
        match &self.body {
            Some(value) => serde_json::to_vec(value)
                .map(Bytes::from)
                .map_err(|e| NetworkError::InvalidRequest(e.to_string())),
            None => Ok(Bytes::new()),
        }
    }
}

/// A complete response, whatever its status
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub reason: String,
    pub body: Bytes,
}

impl RawResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            reason: canonical_reason(status),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as UTF-8 text, lossy
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Turn a non-2xx response into `ApiError::Status`
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` carrying status, reason and body when the
    /// status is outside 200..300.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::Status {
                status: self.status,
                reason: self.reason.clone(),
                body: self.text(),
            })
        }
    }

    /// Decode the body as JSON
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidPayload` naming `context` when the
    /// body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self, context: &str) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(|e| {
            dump_invalid_payload(context, &self.body);
            ValidationError::InvalidPayload {
                context: context.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }
}

/// Directory that receives bodies which failed to decode
pub const DUMP_INVALID_ENV: &str = "SNAPKIT_DUMP_INVALID";

fn dump_invalid_payload(context: &str, body: &Bytes) {
    let Some(dir) = std::env::var_os(DUMP_INVALID_ENV) else {
        return;
    };
    spawn_dump(PathBuf::from(dir), context.to_string(), body.clone());
}

/// Diagnostic only: the write goes to the blocking pool when a runtime is
/// running, and happens inline otherwise
fn spawn_dump(dir: PathBuf, context: String, body: Bytes) -> Option<JoinHandle<()>> {
    let save = move || match save_payload(&dir, &context, &body) {
        Ok(path) => warn!(path = %path.display(), context = %context, "saved undecodable payload"),
        Err(e) => warn!(error = %e, context = %context, "could not save undecodable payload"),
    };
    if let Ok(handle) = Handle::try_current() {
        Some(handle.spawn_blocking(save))
    } else {
        save();
        None
    }
}

fn save_payload(dir: &Path, context: &str, body: &[u8]) -> std::io::Result<PathBuf> {
    let name: String = context
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let path = dir.join(format!(
        "{name}-{}.json",
        chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f")
    ));
    std::fs::create_dir_all(dir)?;
    std::fs::write(&path, body)?;
    Ok(path)
}

/// Standard reason phrase for a status code
#[must_use]
pub fn canonical_reason(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_undecodable_payload_saved_off_thread() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("dumps");

        let handle = spawn_dump(
            target.clone(),
            "daemon response".to_string(),
            Bytes::from_static(b"{not json"),
        )
        .unwrap();
        handle.await.unwrap();

        let saved: Vec<_> = std::fs::read_dir(&target).unwrap().map(|e| e.unwrap().path()).collect();
        assert_eq!(saved.len(), 1);
        let name = saved[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("daemon-response-"));
        assert_eq!(std::fs::read(&saved[0]).unwrap(), b"{not json");
    }

    #[test]
    fn test_undecodable_payload_saved_inline_without_runtime() {
        let dir = tempfile::tempdir().unwrap();
        assert!(spawn_dump(dir.path().to_path_buf(), "x".to_string(), Bytes::from_static(b"?")).is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let request = HttpRequest::get("/v2/snaps").query("snaps", "core,hello");
        let url = request.resolve("http://localhost/").unwrap();
        assert_eq!(url.as_str(), "http://localhost/v2/snaps?snaps=core%2Chello");

        let request = HttpRequest::get("https://api.snapcraft.io/api/v1/snaps/download/x_5.snap");
        let url = request.resolve("http://ignored").unwrap();
        assert_eq!(url.host_str(), Some("api.snapcraft.io"));
        assert_eq!(request.display_path(), "/api/v1/snaps/download/x_5.snap");
    }

    #[test]
    fn test_error_for_status() {
        let response = RawResponse::new(404, r#"{"type":"error"}"#);
        assert_eq!(response.reason, "Not Found");
        let err = response.error_for_status().unwrap_err();
        assert_eq!(err.status(), 404);
        assert_eq!(err.body(), r#"{"type":"error"}"#);

        assert!(RawResponse::new(202, "{}").error_for_status().is_ok());
    }

    #[test]
    fn test_json_decode_failure_is_validation_error() {
        let response = RawResponse::new(200, "not json");
        let err = response.json::<serde_json::Value>("snaps").unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::InvalidPayload { ref context, .. }) if context == "snaps"
        ));
    }
}
