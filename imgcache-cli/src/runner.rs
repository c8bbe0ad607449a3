//! Shared setup for CLI commands: configuration, logging and runtime.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::runtime::Runtime;
use tracing::info;

use imgcache::config::ConfigFile;
use imgcache::logging::{init_logging, LoggingGuard};
use imgcache::{AppConfig, DiskCacheEngine};

use crate::error::CliError;

/// Loaded configuration plus the process-wide logging and runtime.
pub struct CliRunner {
    config: ConfigFile,
    runtime: Runtime,
    _logging: LoggingGuard,
}

impl CliRunner {
    /// Load configuration and initialize logging and the runtime.
    pub fn new(
        config_path: Option<&Path>,
        cache_dir: Option<PathBuf>,
        verbose: bool,
    ) -> Result<Self, CliError> {
        let mut config = match config_path {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        };
        if let Some(dir) = cache_dir {
            config.cache.directory = dir;
        }

        let mut logging = config.logging.clone();
        if verbose {
            logging = logging.verbose();
        }
        let guard = init_logging(&logging)?;

        let runtime = Runtime::new().map_err(CliError::Runtime)?;

        info!(
            version = imgcache::VERSION,
            cache_dir = %config.cache.directory.display(),
            "imgcache starting"
        );

        Ok(Self {
            config,
            runtime,
            _logging: guard,
        })
    }

    /// The loaded configuration file.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Application config derived from the configuration file.
    pub fn app_config(&self) -> AppConfig {
        AppConfig::from_config_file(&self.config)
    }

    /// A disk engine for the configured cache directory.
    pub fn disk_engine(&self) -> Arc<DiskCacheEngine> {
        Arc::new(DiskCacheEngine::new(&self.config.cache.directory))
    }

    /// Run a future to completion on the CLI runtime.
    pub fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
