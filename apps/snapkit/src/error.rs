//! CLI error handling

use std::fmt;

use snapkit_errors::UserFacingError;
use snapkit_types::ChangeStatus;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Error from the client libraries
    Client(snapkit_errors::Error),

    /// A change finished, but not successfully
    ChangeFailed {
        id: String,
        status: ChangeStatus,
        message: Option<String>,
    },

    /// Invalid command arguments
    InvalidArguments(String),
    /// I/O error
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Client(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::ChangeFailed {
                id,
                status,
                message,
            } => {
                write!(f, "change {id} ended in status {status}")?;
                if let Some(message) = message {
                    write!(f, "\n  {message}")?;
                }
                Ok(())
            }
            CliError::InvalidArguments(msg) => write!(f, "Invalid arguments: {msg}"),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Client(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<snapkit_errors::Error> for CliError {
    fn from(e: snapkit_errors::Error) -> Self {
        CliError::Client(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
