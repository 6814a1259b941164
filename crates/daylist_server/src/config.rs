//! Server configuration.
//!
//! # Responsibility
//! - Resolve settings from defaults, an optional TOML file, and environment
//!   overrides, in that order.
//! - Reject invalid values before any resource is opened.
//!
//! # Environment
//! - `DAYLIST_CONFIG`: path to a TOML file.
//! - `DAYLIST_BIND`, `DAYLIST_STORE`, `DAYLIST_DB_PATH`, `DAYLIST_LOG_LEVEL`,
//!   `DAYLIST_LOG_DIR`, `DAYLIST_SWEEP_INTERVAL_SECS`: per-field overrides.

use daylist_core::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "DAYLIST_CONFIG";
pub const ENV_BIND: &str = "DAYLIST_BIND";
pub const ENV_STORE: &str = "DAYLIST_STORE";
pub const ENV_DB_PATH: &str = "DAYLIST_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "DAYLIST_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "DAYLIST_LOG_DIR";
pub const ENV_SWEEP_INTERVAL_SECS: &str = "DAYLIST_SWEEP_INTERVAL_SECS";

const DEFAULT_DB_PATH: &str = "daylist.sqlite3";
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Task store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Non-durable in-process map.
    Memory,
    /// SQLite database file at `db_path`.
    Sqlite,
}

impl StoreBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// Resolved server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreBackend,
    pub db_path: PathBuf,
    pub log_level: String,
    /// Absolute directory for rolling log files; stderr when unset.
    pub log_dir: Option<String>,
    pub sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            store: StoreBackend::Sqlite,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_level: default_log_level().to_string(),
            log_dir: None,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|key| std::env::var(key).ok())
    }

    /// Loads configuration using `lookup` as the environment.
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(ENV_CONFIG_PATH).filter(|path| !path.trim().is_empty()) {
            Some(path) => Self::from_file(PathBuf::from(path.trim()))?,
            None => Self::default(),
        };
        config.apply_env(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse {
            path: None,
            message: err.to_string(),
        })
    }

    fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|err| ConfigError::Parse {
            path: Some(path),
            message: err.to_string(),
        })
    }

    fn apply_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(value) = lookup(ENV_BIND) {
            self.bind_addr = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid(ENV_BIND, &value, "expected host:port"))?;
        }
        if let Some(value) = lookup(ENV_STORE) {
            self.store = StoreBackend::parse(&value)
                .ok_or_else(|| ConfigError::invalid(ENV_STORE, &value, "expected memory|sqlite"))?;
        }
        if let Some(value) = lookup(ENV_DB_PATH) {
            self.db_path = PathBuf::from(value.trim());
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            self.log_level = value.trim().to_string();
        }
        if let Some(value) = lookup(ENV_LOG_DIR) {
            let trimmed = value.trim();
            self.log_dir = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        if let Some(value) = lookup(ENV_SWEEP_INTERVAL_SECS) {
            self.sweep_interval_secs = value.trim().parse().map_err(|_| {
                ConfigError::invalid(ENV_SWEEP_INTERVAL_SECS, &value, "expected whole seconds")
            })?;
        }
        Ok(())
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "sweep_interval_secs",
                "0",
                "must be at least 1",
            ));
        }
        if self.store == StoreBackend::Sqlite && self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::invalid(
                "db_path",
                "",
                "required when store is sqlite",
            ));
        }
        Ok(())
    }

    /// Interval between recurring reset sweeps.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Configuration loading errors.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: Option<PathBuf>,
        message: String,
    },
    InvalidValue {
        key: String,
        value: String,
        reason: &'static str,
    },
}

impl ConfigError {
    fn invalid(key: &str, value: &str, reason: &'static str) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason,
        }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse {
                path: Some(path),
                message,
            } => write!(f, "invalid config `{}`: {message}", path.display()),
            Self::Parse { path: None, message } => write!(f, "invalid config: {message}"),
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid value `{value}` for `{key}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}
