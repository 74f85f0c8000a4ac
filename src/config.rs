//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::TimePeriod;
use crate::rest::DEFAULT_API_ROOT;
use crate::streaming::{Playback, PlaybackMode, SessionConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub node: NodeSettings,

    #[serde(default)]
    pub streaming: StreamingSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Sensor hub connection
#[derive(Debug, Clone, Deserialize)]
pub struct NodeSettings {
    #[serde(default = "default_protocol")]
    pub protocol: String,

    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_api_root")]
    pub api_root: String,

    pub username: Option<String>,

    pub password: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_protocol() -> String {
    "http".to_string()
}

fn default_address() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8181
}

fn default_api_root() -> String {
    DEFAULT_API_ROOT.to_string()
}

fn default_request_timeout() -> u64 {
    10_000
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            protocol: default_protocol(),
            address: default_address(),
            port: default_port(),
            api_root: default_api_root(),
            username: None,
            password: None,
            request_timeout_ms: default_request_timeout(),
        }
    }
}

/// Observation streaming
#[derive(Debug, Clone, Deserialize)]
pub struct StreamingSettings {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    #[serde(default)]
    pub playback: PlaybackMode,

    /// Archive playback start (ISO-8601 or `now`)
    pub start: Option<String>,

    /// Archive playback end (ISO-8601 or `now`)
    pub end: Option<String>,
}

fn default_connect_timeout() -> u64 {
    10_000 // 10 seconds
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            playback: PlaybackMode::default(),
            start: None,
            end: None,
        }
    }
}

impl StreamingSettings {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
        }
    }

    /// Playback settings; archive bounds must come as a pair
    pub fn playback(&self) -> Result<Playback, ConfigError> {
        let period = match (&self.start, &self.end) {
            (Some(start), Some(end)) => Some(
                TimePeriod::parse(start, end).map_err(|e| ConfigError::Invalid(e.to_string()))?,
            ),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid(
                    "streaming.start and streaming.end must be set together".to_string(),
                ))
            }
        };

        Ok(Playback {
            mode: self.playback,
            period,
        })
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("oshconnect").join("config.toml")),
            Some(PathBuf::from("/etc/oshconnect/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Node overrides
        if let Some(protocol) = lookup("OSHCONNECT_PROTOCOL") {
            self.node.protocol = protocol;
        }
        if let Some(address) = lookup("OSHCONNECT_ADDRESS") {
            self.node.address = address;
        }
        if let Some(port) = lookup("OSHCONNECT_PORT").and_then(|p| p.parse().ok()) {
            self.node.port = port;
        }
        if let Some(username) = lookup("OSHCONNECT_USERNAME") {
            self.node.username = Some(username);
        }
        if let Some(password) = lookup("OSHCONNECT_PASSWORD") {
            self.node.password = Some(password);
        }

        // Streaming overrides
        if let Some(timeout) = lookup("OSHCONNECT_CONNECT_TIMEOUT_MS").and_then(|t| t.parse().ok()) {
            self.streaming.connect_timeout_ms = timeout;
        }

        // Logging overrides
        if let Some(level) = lookup("OSHCONNECT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("OSHCONNECT_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# OSH Connect Configuration
#
# Environment variables override these settings:
# - OSHCONNECT_PROTOCOL
# - OSHCONNECT_ADDRESS
# - OSHCONNECT_PORT
# - OSHCONNECT_USERNAME
# - OSHCONNECT_PASSWORD
# - OSHCONNECT_CONNECT_TIMEOUT_MS
# - OSHCONNECT_LOG_LEVEL
# - OSHCONNECT_LOG_FORMAT

[node]
# http or https (streams use ws / wss accordingly)
protocol = "http"
address = "localhost"
port = 8181

# API root below the server
api_root = "sensorhub/api"

# Basic auth credentials (optional)
# username = "admin"
# password = "admin"

# REST request timeout (ms)
request_timeout_ms = 10000

[streaming]
# WebSocket connect timeout (ms)
connect_timeout_ms = 10000

# realtime or archive
playback = "realtime"

# Archive playback window (both required in archive mode unless the
# datastream declares a valid time)
# start = "2024-01-01T00:00:00Z"
# end = "now"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty or json
format = "pretty"

# Log file (optional, logs to stdout if not set)
# file = "/var/log/oshconnect.log"
"#
    .to_string()
}
