//! Core traits for cache engines.
//!
//! # Dyn Compatibility
//!
//! Methods return [`BoxFuture`] so engines can be shared as
//! `Arc<dyn CacheEngine>` between the readiness gate, the resolver and any
//! number of bindings.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;

use thiserror::Error;

use super::options::EngineOptions;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors reported by a cache engine.
///
/// `Init` settles the readiness gate as failed. Every other variant is a
/// single failed attempt from the resolver's point of view and is absorbed
/// by its retry loop.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine could not be initialized.
    #[error("Engine initialization failed: {0}")]
    Init(String),

    /// An operation was attempted before `init` completed.
    #[error("Engine is not initialized")]
    NotInitialized,

    /// Fetching the remote resource failed.
    #[error("Download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    /// The remote resource did not arrive in time.
    #[error("Download of {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// Persisting the downloaded bytes failed.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result of an `is_cached` lookup.
///
/// The path is where the resource lives (or would live) in the cache. It is
/// only meaningful to callers when `found` is true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLookup {
    /// Local path of the cached copy.
    pub path: PathBuf,
    /// Whether a cached copy exists.
    pub found: bool,
}

impl CacheLookup {
    /// A lookup that found a cached copy at `path`.
    pub fn hit(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            found: true,
        }
    }

    /// A lookup that found nothing; `path` is where the copy would be stored.
    pub fn miss(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            found: false,
        }
    }
}

/// Persistent storage collaborator driven by the resolver.
///
/// Implementations own all storage concerns: naming, locking, timeouts and
/// byte persistence. The orchestration layer relies only on the contracts
/// documented on each method.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` for use across async tasks.
pub trait CacheEngine: Send + Sync {
    /// Initialize the engine.
    ///
    /// Invoked once per gate, again only if an initialization was cancelled
    /// before it finished. Options are passed through unmodified from
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Init` if the engine cannot become usable.
    fn init<'a>(&'a self, options: &'a EngineOptions) -> BoxFuture<'a, Result<(), EngineError>>;

    /// Look up a URL in the cache.
    ///
    /// Pure query with no side effect on storage. Engines that cannot answer
    /// (I/O failure, not initialized) report `found: false`.
    fn is_cached<'a>(&'a self, url: &'a str) -> BoxFuture<'a, CacheLookup>;

    /// Download the URL and persist it in the cache.
    ///
    /// May be called repeatedly for the same URL.
    ///
    /// # Errors
    ///
    /// Returns an error if this single attempt failed.
    fn cache_file<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(), EngineError>>;
}
