#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for snapkit
//!
//! Two transports share one request model: HTTP/1.1 over snapd's UNIX
//! socket, and a pooled `reqwest` client for the store or a TCP bridge to
//! the daemon. [`RetryingExecutor`] sits on top and adds bounded retry over
//! transient failures, default headers and request events.

mod http;
mod request;
mod retry;
mod transport;
mod unix;

pub use http::{HttpTransport, NetConfig};
pub use request::{canonical_reason, HttpRequest, RawResponse, DUMP_INVALID_ENV};
pub use retry::{RetryPolicy, RetryingExecutor, MAX_RETRY_DELAY};
pub use transport::{DownloadResult, Transport};
pub use unix::UnixSocketTransport;

// Re-exported so callers can build requests without depending on reqwest
pub use reqwest::Method;
