//! Server configuration.

use crate::session::{DEFAULT_ACTION_QUEUE_CAPACITY, DEFAULT_OUTBOUND_CAPACITY, SessionOptions};
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Configuration for the session server, read from TOML.
///
/// Every field is optional in the file; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    port: u16,

    /// Production mode disables permissive CORS.
    #[serde(default)]
    production: bool,

    /// Directory of static frontend files served as fallback.
    #[serde(default)]
    static_dir: Option<PathBuf>,

    /// Inbound command queue capacity per session.
    #[serde(default = "default_action_queue_capacity")]
    action_queue_capacity: usize,

    /// Outbound broadcast buffer per session.
    #[serde(default = "default_outbound_capacity")]
    outbound_capacity: usize,

    /// Lifetime of a WebSocket token in seconds.
    #[serde(default = "default_ws_token_ttl_secs")]
    ws_token_ttl_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_action_queue_capacity() -> usize {
    DEFAULT_ACTION_QUEUE_CAPACITY
}

fn default_outbound_capacity() -> usize {
    DEFAULT_OUTBOUND_CAPACITY
}

fn default_ws_token_ttl_secs() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            production: false,
            static_dir: None,
            action_queue_capacity: default_action_queue_capacity(),
            outbound_capacity: default_outbound_capacity(),
            ws_token_ttl_secs: default_ws_token_ttl_secs(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml(&content)?;
        info!(host = %config.host, port = config.port, "Config loaded successfully");
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise returns the defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            info!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Parses and validates TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.action_queue_capacity == 0 {
            return Err(ConfigError::new("action_queue_capacity must be at least 1"));
        }
        if self.outbound_capacity == 0 {
            return Err(ConfigError::new("outbound_capacity must be at least 1"));
        }
        Ok(())
    }

    /// Replaces the bind host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Replaces the bind port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Replaces the static directory.
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Switches production mode.
    pub fn with_production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    /// Returns `host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Channel sizes for new sessions.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions::new(self.action_queue_capacity, self.outbound_capacity)
    }

    /// WebSocket token lifetime.
    pub fn ws_token_ttl(&self) -> Duration {
        Duration::from_secs(self.ws_token_ttl_secs)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error at the caller's location.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
