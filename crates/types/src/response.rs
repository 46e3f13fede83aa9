//! snapd response envelope

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of response snapd sent back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Sync,
    Async,
    Error,
}

/// Envelope wrapping every snapd response
///
/// `result` carries the endpoint-specific payload. Async responses put the
/// id of the spawned change in `change` and leave `result` null or omit it;
/// parse those as `DaemonResponse<Option<_>>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonResponse<T> {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    #[serde(rename = "status-code", alias = "status_code")]
    pub status_code: u16,
    pub status: String,
    pub result: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(
        rename = "warning-count",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub warning_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<ErrorResult>,
}

impl<T> DaemonResponse<T> {
    /// Whether snapd reported a 2xx status in the envelope
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Whether this is an `async` response that spawned a change
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.response_type == ResponseType::Async
    }

    /// Replace the payload, keeping the envelope fields
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DaemonResponse<U> {
        DaemonResponse {
            response_type: self.response_type,
            status_code: self.status_code,
            status: self.status,
            result: f(self.result),
            change: self.change,
            sources: self.sources,
            warning_count: self.warning_count,
            maintenance: self.maintenance,
        }
    }
}

/// Body of a `202 Accepted` reply
///
/// snapd sends a full envelope, but minimal bridges answer with just
/// `{"change": "<id>"}`; missing envelope fields come from the HTTP status.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcceptedBody {
    #[serde(rename = "type")]
    pub response_type: Option<ResponseType>,
    #[serde(rename = "status-code", alias = "status_code")]
    pub status_code: Option<u16>,
    pub status: Option<String>,
    #[serde(default)]
    pub result: Value,
    pub change: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(rename = "warning-count")]
    pub warning_count: Option<u32>,
}

impl AcceptedBody {
    /// Complete the envelope using the HTTP status line
    #[must_use]
    pub fn into_response(self, http_status: u16, reason: &str) -> DaemonResponse<Value> {
        DaemonResponse {
            response_type: self.response_type.unwrap_or(ResponseType::Async),
            status_code: self.status_code.unwrap_or(http_status),
            status: self.status.unwrap_or_else(|| reason.to_string()),
            result: self.result,
            change: self.change,
            sources: self.sources,
            warning_count: self.warning_count,
            maintenance: None,
        }
    }
}

/// Payload of an `error` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}
