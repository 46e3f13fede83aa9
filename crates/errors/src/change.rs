//! Change polling error types

use std::borrow::Cow;
use std::time::Duration;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ChangeError {
    #[error("change {id} not ready after {polls} polls")]
    PollLimitExceeded { id: String, polls: u32 },

    #[error("change {id} not ready after {elapsed:?}")]
    Timeout { id: String, elapsed: Duration },
}

impl UserFacingError for ChangeError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        Some("The change keeps running in snapd; check it later with `snapkit change <id>`.")
    }

    fn is_retryable(&self) -> bool {
        true
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::PollLimitExceeded { .. } => "change.poll_limit",
            Self::Timeout { .. } => "change.timeout",
        })
    }
}
