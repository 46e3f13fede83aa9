//! HTTP status errors returned by snapd or the store

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("HTTP error {status} {reason}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },
}

impl ApiError {
    /// Numeric status code of the failed response
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Status { status, .. } => *status,
        }
    }

    /// Raw response body, usually a JSON error envelope
    #[must_use]
    pub fn body(&self) -> &str {
        match self {
            Self::Status { body, .. } => body,
        }
    }
}

impl UserFacingError for ApiError {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Self::Status {
                status,
                reason,
                body,
            } => {
                // snapd and the store both put a human message in the body
                let detail = serde_json::from_str::<serde_json::Value>(body)
                    .ok()
                    .and_then(|v| {
                        v.pointer("/result/message")
                            .or_else(|| v.pointer("/error-list/0/message"))
                            .and_then(|m| m.as_str().map(str::to_string))
                    });
                match detail {
                    Some(detail) => Cow::Owned(format!("{status} {reason}: {detail}")),
                    None => Cow::Owned(format!("{status} {reason}")),
                }
            }
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self.status() {
            401 | 403 => Some("The operation needs elevated privileges; retry as root."),
            404 => Some("Check the snap, change or category name."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        self.status() >= 500
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self.status() {
            400..=499 => "api.client_error",
            _ => "api.server_error",
        })
    }
}
