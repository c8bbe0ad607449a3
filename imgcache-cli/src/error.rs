//! CLI error types.

use thiserror::Error;

use imgcache::config::ConfigError;
use imgcache::logging::LoggingError;
use imgcache::AppError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Logging could not be set up.
    #[error("{0}")]
    Logging(#[from] LoggingError),

    /// The service could not be started or a request was invalid.
    #[error("{0}")]
    App(#[from] AppError),

    /// The Tokio runtime could not be created.
    #[error("Failed to create Tokio runtime: {0}")]
    Runtime(std::io::Error),

    /// The cache engine failed to initialize.
    #[error("Cache engine failed to initialize at {0}")]
    EngineUnavailable(String),

    /// Reading cache statistics failed.
    #[error("Failed to read cache statistics: {0}")]
    CacheStats(std::io::Error),

    /// Clearing the cache failed.
    #[error("Failed to clear cache: {0}")]
    CacheClear(std::io::Error),
}
