//! Payload and argument validation errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("invalid {context} payload: {message}")]
    InvalidPayload { context: String, message: String },

    #[error("invalid field '{field}', expected one of: {allowed}")]
    InvalidField { field: String, allowed: String },

    #[error("invalid architecture '{arch}', expected one of: {allowed}")]
    InvalidArchitecture { arch: String, allowed: String },

    #[error("async response from {endpoint} carried no change id")]
    MissingChangeId { endpoint: String },

    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },
}

impl UserFacingError for ValidationError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidPayload { .. } => {
                Some("The server sent an unexpected response; it may be a newer API version.")
            }
            Self::InvalidField { .. } | Self::InvalidArchitecture { .. } => {
                Some("Use one of the listed values.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::InvalidPayload { .. } => "validation.payload",
            Self::InvalidField { .. } => "validation.field",
            Self::InvalidArchitecture { .. } => "validation.architecture",
            Self::MissingChangeId { .. } => "validation.change_id",
            Self::InvalidArgument { .. } => "validation.argument",
        })
    }
}
