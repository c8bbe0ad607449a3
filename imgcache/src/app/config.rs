//! Application configuration for [`ImgCacheService`](super::ImgCacheService).
//!
//! `AppConfig` combines resolver tuning, the engine option bag and the
//! initialization mode. Build it programmatically, or from a
//! [`ConfigFile`] so the translation lives in one place rather than in CLI
//! code.

use std::path::PathBuf;

use crate::config::{default_cache_dir, ConfigFile};
use crate::engine::EngineOptions;
use crate::resolver::{GateFailurePolicy, ResolverConfig};

/// Application configuration combining all component configs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    /// Directory for the disk engine.
    pub cache_directory: PathBuf,

    /// Retry and gate-failure settings.
    pub resolver: ResolverConfig,

    /// Options passed through to `CacheEngine::init`.
    pub engine_options: EngineOptions,

    /// Wait for an explicit `initialize` call instead of starting at once.
    pub manual_init: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_directory: default_cache_dir(),
            resolver: ResolverConfig::default(),
            engine_options: EngineOptions::new(),
            manual_init: false,
        }
    }
}

impl AppConfig {
    /// Create a config caching into `cache_directory` with default settings.
    pub fn new(cache_directory: impl Into<PathBuf>) -> Self {
        Self {
            cache_directory: cache_directory.into(),
            ..Self::default()
        }
    }

    /// Create application config from a loaded configuration file.
    pub fn from_config_file(config: &ConfigFile) -> Self {
        Self {
            cache_directory: config.cache.directory.clone(),
            resolver: ResolverConfig {
                max_attempts: config.cache.max_attempts,
                on_gate_failure: config.cache.on_gate_failure,
            },
            engine_options: config.engine.clone(),
            manual_init: config.cache.manual_init,
        }
    }

    /// Set the retry bound.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.resolver.max_attempts = max_attempts;
        self
    }

    /// Set the gate-failure policy.
    pub fn with_gate_failure_policy(mut self, policy: GateFailurePolicy) -> Self {
        self.resolver.on_gate_failure = policy;
        self
    }

    /// Require an explicit `initialize` call.
    pub fn with_manual_init(mut self, manual_init: bool) -> Self {
        self.manual_init = manual_init;
        self
    }

    /// Set one engine option.
    pub fn set_option(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.engine_options.set(name, value);
    }

    /// Merge several engine options. Later values win.
    pub fn set_options<I, K, V>(&mut self, options: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.engine_options.extend(options);
    }
}
