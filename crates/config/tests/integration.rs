//! Integration tests for config

#[cfg(test)]
mod tests {
    use snapkit_config::*;
    use snapkit_types::OutputFormat;
    use std::io::Write;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_VARS: &[&str] = &[
        "SNAPKIT_SOCKET",
        "SNAPKIT_TCP",
        "SNAPKIT_OUTPUT",
        "SNAPKIT_POLL_INTERVAL_MS",
        "SNAPKIT_POLL_TIMEOUT_SECS",
        "SNAPKIT_RETRIES",
        "SNAPKIT_ALLOW_INTERACTION",
        "SNAPKIT_STORE_URL",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[general]
default_output = "json"

[daemon]
tcp_location = "http://127.0.0.1:8181"
allow_interaction = true

[store]
base_url = "http://localhost:8000"

[store.headers]
Snap-Device-Architecture = "amd64"

[network]
retries = 5
retry_delay_ms = 50

[polling]
interval_ms = 250
max_polls = 100
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.general.default_output, OutputFormat::Json);
        assert_eq!(
            config.daemon_endpoint(),
            DaemonEndpoint::Tcp("http://127.0.0.1:8181".to_string())
        );
        assert_eq!(config.store.base_url, "http://localhost:8000");
        assert_eq!(
            config
                .store_headers()
                .get("Snap-Device-Architecture")
                .map(String::as_str),
            Some("amd64")
        );
        assert_eq!(config.network.retries, 5);
        assert_eq!(config.retry_delay(), Duration::from_millis(50));
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.polling.max_polls, Some(100));
        // untouched sections keep defaults
        assert_eq!(config.daemon.api_version, "v2");
    }

    #[tokio::test]
    async fn test_conflicting_file_is_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[daemon]
socket_path = "/tmp/snapd.socket"
tcp_location = "http://127.0.0.1:8181"
        "#
        )
        .unwrap();

        assert!(Config::load_from_file(temp_file.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_infinite_backoff_in_file_is_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[network]
retry_delay_ms = 1
backoff_multiplier = inf
        "#
        )
        .unwrap();

        assert!(Config::load_from_file(temp_file.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = Config::load_from_file(std::path::Path::new("/nonexistent/snapkit.toml")).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("SNAPKIT_OUTPUT", "json");
        std::env::set_var("SNAPKIT_POLL_INTERVAL_MS", "500");
        std::env::set_var("SNAPKIT_POLL_TIMEOUT_SECS", "60");

        let mut config = Config::default();
        config.merge_env().unwrap();

        assert_eq!(config.general.default_output, OutputFormat::Json);
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.poll_timeout(), Some(Duration::from_secs(60)));

        clear_env();
    }

    #[test]
    fn test_env_tcp_overrides_file_socket() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("SNAPKIT_TCP", "http://10.0.0.2:8181");

        let mut config = Config::default();
        config.daemon.socket_path = Some("/tmp/snapd.socket".into());
        config.merge_env().unwrap();

        assert_eq!(
            config.daemon_endpoint(),
            DaemonEndpoint::Tcp("http://10.0.0.2:8181".to_string())
        );
        assert!(config.daemon.socket_path.is_none());

        clear_env();
    }

    #[test]
    fn test_invalid_env_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("SNAPKIT_POLL_INTERVAL_MS", "soon");
        let mut config = Config::default();
        assert!(config.merge_env().is_err());

        std::env::set_var("SNAPKIT_POLL_INTERVAL_MS", "0");
        let mut config = Config::default();
        assert!(config.merge_env().is_err());

        clear_env();
    }
}
