#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for snapkit
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/snapkit/config.toml)
//! - Environment variables
//! - CLI flags

pub mod constants;

use serde::{Deserialize, Serialize};
use snapkit_errors::{ConfigError, Error};
use snapkit_types::OutputFormat;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub daemon: DaemonConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub polling: PollingConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeneralConfig {
    #[serde(default)]
    pub default_output: OutputFormat,
}

/// snapd connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// UNIX socket path; defaults to `/run/snapd.socket` when no TCP location is set
    pub socket_path: Option<PathBuf>,
    /// Base URL of a TCP bridge to snapd, e.g. `http://127.0.0.1:8181`
    pub tcp_location: Option<String>,
    #[serde(default = "default_daemon_api_version")]
    pub api_version: String,
    /// Let snapd prompt through polkit for privileged operations
    #[serde(default)]
    pub allow_interaction: bool,
}

/// Snap Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_url")]
    pub base_url: String,
    #[serde(default = "default_store_api_version")]
    pub api_version: String,
    #[serde(default = "default_series")]
    pub series: String,
    /// Extra headers sent with every store request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64, // seconds
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

/// Change polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    /// Give up after this many fetches (unbounded when absent)
    pub max_polls: Option<u32>,
    /// Give up after this many seconds (unbounded when absent)
    pub timeout_secs: Option<u64>,
}

/// Where snapd is reachable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonEndpoint {
    Socket(PathBuf),
    Tcp(String),
}

// Default implementations

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            tcp_location: None,
            api_version: default_daemon_api_version(),
            allow_interaction: false,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_store_url(),
            api_version: default_store_api_version(),
            series: default_series(),
            headers: BTreeMap::new(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            connect_timeout: 10,
            retries: 3,
            retry_delay_ms: 1000,
            backoff_multiplier: 1.0,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: constants::POLL_INTERVAL_MS,
            max_polls: None,
            timeout_secs: None,
        }
    }
}

// Default value functions for serde
fn default_daemon_api_version() -> String {
    constants::DAEMON_API_VERSION.to_string()
}

fn default_store_url() -> String {
    constants::STORE_BASE_URL.to_string()
}

fn default_store_api_version() -> String {
    constants::STORE_API_VERSION.to_string()
}

fn default_series() -> String {
    constants::STORE_SERIES.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_poll_interval_ms() -> u64 {
    constants::POLL_INTERVAL_MS
}

fn invalid(field: &str, value: impl Into<String>) -> Error {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.into(),
    }
    .into()
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("snapkit").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid TOML,
    /// or fails [`Config::validate`].
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;

        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// Selecting a socket or a TCP location through the environment clears
    /// the other one, so the environment always wins over the file.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // SNAPKIT_SOCKET
        if let Ok(socket) = std::env::var("SNAPKIT_SOCKET") {
            self.daemon.socket_path = Some(PathBuf::from(socket));
            self.daemon.tcp_location = None;
        }

        // SNAPKIT_TCP
        if let Ok(tcp) = std::env::var("SNAPKIT_TCP") {
            self.daemon.tcp_location = Some(tcp);
            self.daemon.socket_path = None;
        }

        // SNAPKIT_ALLOW_INTERACTION
        if let Ok(value) = std::env::var("SNAPKIT_ALLOW_INTERACTION") {
            self.daemon.allow_interaction = match value.as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => return Err(invalid("SNAPKIT_ALLOW_INTERACTION", value)),
            };
        }

        // SNAPKIT_STORE_URL
        if let Ok(url) = std::env::var("SNAPKIT_STORE_URL") {
            self.store.base_url = url;
        }

        // SNAPKIT_OUTPUT
        if let Ok(output) = std::env::var("SNAPKIT_OUTPUT") {
            self.general.default_output = match output.as_str() {
                "plain" => OutputFormat::Plain,
                "json" => OutputFormat::Json,
                _ => return Err(invalid("SNAPKIT_OUTPUT", output)),
            };
        }

        // SNAPKIT_RETRIES
        if let Ok(retries) = std::env::var("SNAPKIT_RETRIES") {
            self.network.retries = retries
                .parse()
                .map_err(|_| invalid("SNAPKIT_RETRIES", retries))?;
        }

        // SNAPKIT_POLL_INTERVAL_MS
        if let Ok(interval) = std::env::var("SNAPKIT_POLL_INTERVAL_MS") {
            self.polling.interval_ms = interval
                .parse()
                .map_err(|_| invalid("SNAPKIT_POLL_INTERVAL_MS", interval))?;
        }

        // SNAPKIT_POLL_TIMEOUT_SECS
        if let Ok(timeout) = std::env::var("SNAPKIT_POLL_TIMEOUT_SECS") {
            self.polling.timeout_secs = Some(
                timeout
                    .parse()
                    .map_err(|_| invalid("SNAPKIT_POLL_TIMEOUT_SECS", timeout))?,
            );
        }

        self.validate()
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns an error if both a socket and a TCP location are configured,
    /// the poll interval is zero, fewer than one attempt is allowed, or the
    /// backoff multiplier is below 1 or not finite.
    pub fn validate(&self) -> Result<(), Error> {
        if self.daemon.socket_path.is_some() && self.daemon.tcp_location.is_some() {
            return Err(ConfigError::Conflict {
                first: "daemon.socket_path".to_string(),
                second: "daemon.tcp_location".to_string(),
            }
            .into());
        }
        if self.polling.interval_ms == 0 {
            return Err(invalid("polling.interval_ms", "0"));
        }
        if self.network.retries == 0 {
            return Err(invalid("network.retries", "0"));
        }
        let multiplier = self.network.backoff_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(invalid(
                "network.backoff_multiplier",
                self.network.backoff_multiplier.to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve where snapd is reachable
    #[must_use]
    pub fn daemon_endpoint(&self) -> DaemonEndpoint {
        match (&self.daemon.tcp_location, &self.daemon.socket_path) {
            (Some(tcp), _) => DaemonEndpoint::Tcp(tcp.trim_end_matches('/').to_string()),
            (None, Some(path)) => DaemonEndpoint::Socket(path.clone()),
            (None, None) => DaemonEndpoint::Socket(PathBuf::from(constants::SNAPD_SOCKET)),
        }
    }

    /// Headers attached to every store request
    #[must_use]
    pub fn store_headers(&self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert("Snap-Device-Series".to_string(), self.store.series.clone());
        headers.insert("X-Ubuntu-Series".to_string(), self.store.series.clone());
        headers.extend(self.store.headers.clone());
        headers
    }

    /// Headers attached to every snapd request
    #[must_use]
    pub fn daemon_headers(&self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        if self.daemon.allow_interaction {
            headers.insert("X-Allow-Interaction".to_string(), "true".to_string());
        }
        headers
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.polling.interval_ms)
    }

    #[must_use]
    pub fn poll_timeout(&self) -> Option<Duration> {
        self.polling.timeout_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.network.timeout)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.network.connect_timeout)
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.network.retry_delay_ms)
    }
}
