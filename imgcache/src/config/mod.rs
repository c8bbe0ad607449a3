//! INI configuration file.
//!
//! Default location: `~/.imgcache/config.ini`. A missing file is not an
//! error; every setting has a default.
//!
//! ```ini
//! [cache]
//! directory = ~/.cache/imgcache
//! max_attempts = 2
//! manual_init = false
//! on_gate_failure = proceed
//!
//! [engine]
//! timeout_secs = 30
//!
//! [logging]
//! level = info
//! file = ~/.imgcache/imgcache.log
//! ```
//!
//! Everything under `[engine]` is handed to the cache engine untouched.

use std::io;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::engine::EngineOptions;
use crate::logging::LoggingConfig;
use crate::resolver::{GateFailurePolicy, DEFAULT_MAX_ATTEMPTS};

/// Name of the per-user configuration directory.
const CONFIG_DIR_NAME: &str = ".imgcache";

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.ini";

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not valid INI.
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// A setting has an unusable value.
    #[error("Invalid value '{value}' for [{section}] {key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Directory cached images are stored in.
    pub directory: PathBuf,
    /// Retries after the first failed download.
    pub max_attempts: u32,
    /// Wait for an explicit `initialize` instead of starting at once.
    pub manual_init: bool,
    /// Behaviour after a failed engine initialization.
    pub on_gate_failure: GateFailurePolicy,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            manual_init: false,
            on_gate_failure: GateFailurePolicy::default(),
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    /// `[cache]` settings.
    pub cache: CacheSettings,
    /// `[engine]` options, passed through to the engine.
    pub engine: EngineOptions,
    /// `[logging]` settings.
    pub logging: LoggingConfig,
}

impl ConfigFile {
    /// Load from the default location, falling back to defaults if absent.
    pub fn load() -> Result<Self, ConfigError> {
        match config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&contents)
    }

    /// Parse INI text.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("cache")) {
            if let Some(v) = section.get("directory") {
                config.cache.directory = expand_tilde(v.trim());
            }
            if let Some(v) = section.get("max_attempts") {
                config.cache.max_attempts = v.trim().parse().map_err(|e: std::num::ParseIntError| {
                    invalid("cache", "max_attempts", v, e.to_string())
                })?;
            }
            if let Some(v) = section.get("manual_init") {
                config.cache.manual_init = parse_bool(v)
                    .ok_or_else(|| invalid("cache", "manual_init", v, "expected true or false"))?;
            }
            if let Some(v) = section.get("on_gate_failure") {
                config.cache.on_gate_failure = GateFailurePolicy::from_config_str(v).ok_or_else(
                    || invalid("cache", "on_gate_failure", v, "expected proceed or fallback"),
                )?;
            }
        }

        if let Some(section) = ini.section(Some("engine")) {
            config.engine.extend(section.iter());
        }

        if let Some(section) = ini.section(Some("logging")) {
            if let Some(v) = section.get("level") {
                config.logging.level = v.trim().to_string();
            }
            if let Some(v) = section.get("file") {
                let v = v.trim();
                config.logging.file = (!v.is_empty()).then(|| expand_tilde(v));
            }
        }

        Ok(config)
    }
}

/// Path of the default configuration file.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Default image cache directory (`<platform cache dir>/imgcache`).
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("imgcache")
}

fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}
