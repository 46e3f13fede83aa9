//! Integration tests for error types

#[cfg(test)]
mod tests {
    use snapkit_errors::*;

    #[test]
    fn test_error_conversion() {
        let net_err = NetworkError::Timeout {
            url: "http://localhost/v2/snaps".into(),
        };
        let err: Error = net_err.into();
        assert!(matches!(err, Error::Network(_)));
    }

    #[test]
    fn test_error_display() {
        let err = ChangeError::PollLimitExceeded {
            id: "42".into(),
            polls: 5,
        };
        assert_eq!(err.to_string(), "change 42 not ready after 5 polls");
    }

    #[test]
    fn test_status_code_accessor() {
        let err: Error = ApiError::Status {
            status: 404,
            reason: "Not Found".into(),
            body: String::new(),
        }
        .into();
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(Error::Cancelled.status_code(), None);
    }

    #[test]
    fn test_api_error_message_uses_body() {
        let err = ApiError::Status {
            status: 404,
            reason: "Not Found".into(),
            body: r#"{"type":"error","status-code":404,"status":"Not Found","result":{"message":"cannot find change with id \"x\""}}"#.into(),
        };
        assert_eq!(
            err.user_message(),
            "404 Not Found: cannot find change with id \"x\""
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retries_exhausted_retryable() {
        let err = NetworkError::RetriesExhausted {
            attempts: 3,
            last: Box::new(NetworkError::ConnectionRefused("refused".into())),
        };
        assert!(err.is_retryable());
        assert_eq!(err.user_code(), Some("network.retries_exhausted"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let err: Error = io_err.into();
        assert!(matches!(
            err,
            Error::Io {
                kind: std::io::ErrorKind::PermissionDenied,
                ..
            }
        ));
    }
}
