//! Configuration loading and typed config structures.
//!
//! The canonical configuration lives in `coinrelay-config.yaml` at the
//! project root. Every section and field has a serde default, so an empty
//! file (or no file at all) yields a working setup. The game shape itself
//! (rounds, units per round, sub-groups) is fixed and not configurable.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RelayConfig {
    /// HTTP/`WebSocket` listener settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Game registry housekeeping.
    #[serde(default)]
    pub games: GamesConfig,
}

impl RelayConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `COINRELAY_HOST` and `COINRELAY_PORT` override the server section
    /// when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yml maps an empty document to unit, not to an empty map.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.server.apply_env_overrides();
        Ok(config)
    }
}

/// Listener settings for the HTTP/`WebSocket` adapter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    /// Override host and port with environment variables when set.
    ///
    /// An unparseable `COINRELAY_PORT` is ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("COINRELAY_HOST") {
            self.host = val;
        }
        if let Some(port) = std::env::var("COINRELAY_PORT")
            .ok()
            .and_then(|val| val.parse().ok())
        {
            self.port = port;
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Housekeeping for the game registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GamesConfig {
    /// How long a completed game stays queryable before eviction (seconds).
    #[serde(default = "default_completed_retention_secs")]
    pub completed_retention_secs: u64,

    /// Interval between eviction sweeps (seconds). Zero disables sweeping.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl GamesConfig {
    /// Retention window in milliseconds, saturating at `i64::MAX`.
    pub fn completed_retention_ms(&self) -> i64 {
        i64::try_from(self.completed_retention_secs.saturating_mul(1_000)).unwrap_or(i64::MAX)
    }
}

impl Default for GamesConfig {
    fn default() -> Self {
        Self {
            completed_retention_secs: default_completed_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_completed_retention_secs() -> u64 {
    3_600
}

const fn default_sweep_interval_secs() -> u64 {
    60
}
