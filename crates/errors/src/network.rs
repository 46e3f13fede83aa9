//! Transport-level error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum NetworkError {
    #[error("connection timeout to {url}")]
    Timeout { url: String },

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("socket not available: {path}")]
    SocketUnavailable { path: String },

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("SSL/TLS error: {0}")]
    TlsError(String),

    #[error("I/O error during transfer: {0}")]
    Io(String),

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<NetworkError> },
}

impl NetworkError {
    /// Whether the retrying executor may attempt the request again
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::ConnectionRefused(_)
                | Self::SocketUnavailable { .. }
                | Self::RequestFailed(_)
                | Self::Io(_)
        )
    }
}

impl UserFacingError for NetworkError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::SocketUnavailable { .. } => {
                Some("Check that snapd is running and the socket path is correct.")
            }
            Self::ConnectionRefused(_) | Self::Timeout { .. } => {
                Some("Check that the daemon or store endpoint is reachable.")
            }
            Self::RetriesExhausted { .. } => Some("The endpoint kept failing; try again later."),
            Self::TlsError(_) => Some("Verify the store certificate chain and system time."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::RetriesExhausted { last, .. } => last.is_transient(),
            other => other.is_transient(),
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::Timeout { .. } => "network.timeout",
            Self::ConnectionRefused(_) => "network.connection_refused",
            Self::SocketUnavailable { .. } => "network.socket_unavailable",
            Self::RequestFailed(_) => "network.request_failed",
            Self::InvalidUrl(_) => "network.invalid_url",
            Self::InvalidRequest(_) => "network.invalid_request",
            Self::TlsError(_) => "network.tls",
            Self::Io(_) => "network.io",
            Self::RetriesExhausted { .. } => "network.retries_exhausted",
        })
    }
}
