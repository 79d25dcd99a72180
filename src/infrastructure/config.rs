//! Configuration management for the relay
//!
//! Loads configuration from a TOML file at startup. A missing file means
//! defaults; a present but invalid file is an error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::LevelFilter;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "LOG_FAN_CONFIG";

/// Config file used when the environment variable is unset
pub const DEFAULT_CONFIG_PATH: &str = "log-fan.toml";

/// Relay configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Listener and static file settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Fan-out settings
    #[serde(default)]
    pub relay: RelayConfig,

    /// Diagnostic logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address, host:port
    #[serde(default = "default_address")]
    pub address: String,

    /// Directory served under /static/, empty disables static serving
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Page within `static_dir` opened in the browser at startup
    #[serde(default = "default_home_page")]
    pub home_page: String,

    /// Launch the default browser at the home page
    #[serde(default)]
    pub open_browser: bool,
}

/// Fan-out configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    /// Minimum severity forwarded to consumers, 0 (debug) to 3 (error)
    #[serde(default)]
    pub min_level: i64,

    /// Inbound queue bound
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Per-consumer outbox bound
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
}

/// Diagnostic logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Emit diagnostic lines on the console
    #[serde(default)]
    pub to_console: bool,

    /// Directory for daily rolling JSON log files, empty disables
    #[serde(default)]
    pub dir: PathBuf,

    /// Filter directive, e.g. "info" or "log_fan=debug"; `RUST_LOG` overrides it
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            static_dir: default_static_dir(),
            home_page: default_home_page(),
            open_browser: false,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            to_console: false,
            dir: PathBuf::new(),
            filter: default_filter(),
        }
    }
}

impl LogConfig {
    /// Log directory, `None` when file logging is disabled
    pub fn file_dir(&self) -> Option<&Path> {
        if self.dir.as_os_str().is_empty() {
            None
        } else {
            Some(self.dir.as_path())
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            min_level: 0,
            queue_capacity: default_queue_capacity(),
            outbox_capacity: default_outbox_capacity(),
        }
    }
}

fn default_address() -> String {
    "localhost:9000".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("./static/")
}

fn default_home_page() -> String {
    "index.html".to_string()
}

fn default_queue_capacity() -> usize {
    crate::fanout::DEFAULT_QUEUE_CAPACITY
}

fn default_outbox_capacity() -> usize {
    crate::ws::DEFAULT_OUTBOX_CAPACITY
}

fn default_filter() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the file named by `LOG_FAN_CONFIG`
    ///
    /// If the file doesn't exist, returns default configuration.
    /// # Errors
    /// Returns error if file exists but cannot be read, parsed or validated.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = match std::fs::read_to_string(path.as_ref()) {
            Ok(contents) => Self::from_toml(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => return Err(ConfigError::IoError(e)),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML text without validation
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.address.trim().is_empty() {
            return Err(ConfigError::Invalid("server.address must not be empty".into()));
        }
        if LevelFilter::from_raw(self.relay.min_level).is_none() {
            return Err(ConfigError::Invalid(format!(
                "relay.min_level must be in [0, 3], got {}",
                self.relay.min_level
            )));
        }
        if self.relay.queue_capacity == 0 {
            return Err(ConfigError::Invalid("relay.queue_capacity must be > 0".into()));
        }
        if self.relay.outbox_capacity == 0 {
            return Err(ConfigError::Invalid("relay.outbox_capacity must be > 0".into()));
        }
        if self.server.open_browser
            && self.static_dir().is_some()
            && self.server.home_page.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "server.home_page must be set when server.open_browser is enabled".into(),
            ));
        }
        Ok(())
    }

    /// Configured severity threshold
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_raw(self.relay.min_level).ok_or_else(|| {
            ConfigError::Invalid(format!("invalid min_level {}", self.relay.min_level))
        })
    }

    /// Static directory, `None` when serving is disabled
    pub fn static_dir(&self) -> Option<&Path> {
        let dir = self.server.static_dir.as_path();
        if dir.as_os_str().is_empty() {
            None
        } else {
            Some(dir)
        }
    }

    /// URL of the home page served under /static/
    pub fn home_url(&self) -> String {
        format!("http://{}/static/{}", self.server.address, self.server.home_page)
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    /// Parse error (invalid TOML)
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    /// Values out of range
    #[error("Invalid config: {0}")]
    Invalid(String),
}
