//! Disk-backed cache engine.
//!
//! Each URL is stored as a single file named after the SHA-256 of the URL,
//! keeping the original extension so the cached copy stays recognisable:
//!
//! ```text
//! https://example.com/img/logo.png?v=3
//!     → <directory>/<sha256 hex>.png
//! ```
//!
//! Each download is written to its own hidden `.part` file and renamed into
//! place, so `is_cached` never observes a partially written image and
//! concurrent downloads of the same URL never share a temporary file.
//! Partial files are not counted by [`DiskCacheEngine::stats`].
//!
//! # Options
//!
//! | Key | Meaning |
//! |---|---|
//! | `directory` | overrides the directory given to [`DiskCacheEngine::new`] |
//! | `timeout_secs` | per-request HTTP timeout (default [`DEFAULT_TIMEOUT_SECS`]) |
//! | `user_agent` | HTTP `User-Agent` header |
//! | `no_proxy` | `true` to ignore system proxy settings |

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

use reqwest::Client;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::options::EngineOptions;
use super::traits::{BoxFuture, CacheEngine, CacheLookup, EngineError};

/// Default timeout for HTTP requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Longest URL extension carried over to the cache file name.
const MAX_EXTENSION_LEN: usize = 5;

/// Suffix for in-progress downloads.
const PARTIAL_SUFFIX: &str = ".part";

/// Engine state established by `init`.
#[derive(Debug)]
struct DiskState {
    directory: PathBuf,
    client: Client,
    timeout: Duration,
}

/// Size summary of a disk cache directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskCacheStats {
    /// Number of cached files.
    pub files: u64,
    /// Total size of cached files in bytes.
    pub bytes: u64,
}

/// Cache engine persisting images to a local directory.
#[derive(Debug)]
pub struct DiskCacheEngine {
    configured_directory: PathBuf,
    state: OnceLock<DiskState>,
    next_partial: AtomicU64,
}

impl DiskCacheEngine {
    /// Create an engine rooted at `directory`.
    ///
    /// Nothing touches the filesystem until `init` runs.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            configured_directory: directory.into(),
            state: OnceLock::new(),
            next_partial: AtomicU64::new(0),
        }
    }

    /// The directory cached files live in.
    ///
    /// Reflects a `directory` option once the engine is initialized.
    pub fn directory(&self) -> &Path {
        self.state
            .get()
            .map(|s| s.directory.as_path())
            .unwrap_or(self.configured_directory.as_path())
    }

    /// Whether `init` has completed successfully.
    pub fn is_initialized(&self) -> bool {
        self.state.get().is_some()
    }

    /// Local path a URL is (or would be) cached at.
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.directory().join(cache_file_name(url))
    }

    /// Count cached files and their total size.
    ///
    /// In-progress downloads are skipped.
    pub async fn stats(&self) -> std::io::Result<DiskCacheStats> {
        let mut stats = DiskCacheStats::default();
        let mut entries = match tokio::fs::read_dir(self.directory()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(stats),
            Err(e) => return Err(e),
        };

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_file() && !is_partial_name(&entry.file_name()) {
                stats.files += 1;
                stats.bytes += metadata.len();
            }
        }
        Ok(stats)
    }

    /// Remove every cached file, returning what was removed.
    ///
    /// Leftover partial files are removed too but not counted.
    pub async fn clear(&self) -> std::io::Result<DiskCacheStats> {
        let mut removed = DiskCacheStats::default();
        let mut entries = match tokio::fs::read_dir(self.directory()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(removed),
            Err(e) => return Err(e),
        };

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            tokio::fs::remove_file(entry.path()).await?;
            if !is_partial_name(&entry.file_name()) {
                removed.files += 1;
                removed.bytes += metadata.len();
            }
        }
        info!(
            directory = %self.directory().display(),
            files = removed.files,
            bytes = removed.bytes,
            "Cleared disk cache"
        );
        Ok(removed)
    }

    async fn init_state(&self, options: &EngineOptions) -> Result<(), EngineError> {
        if self.state.get().is_some() {
            return Ok(());
        }

        let directory = options
            .get("directory")
            .map(PathBuf::from)
            .unwrap_or_else(|| self.configured_directory.clone());

        let timeout_secs = match options.parse::<u64>("timeout_secs") {
            None => DEFAULT_TIMEOUT_SECS,
            Some(Ok(secs)) => secs,
            Some(Err(e)) => {
                return Err(EngineError::Init(format!("invalid timeout_secs: {}", e)));
            }
        };
        let timeout = Duration::from_secs(timeout_secs);

        tokio::fs::create_dir_all(&directory).await.map_err(|e| {
            EngineError::Init(format!(
                "failed to create cache directory {}: {}",
                directory.display(),
                e
            ))
        })?;

        let mut builder = Client::builder().timeout(timeout);
        if let Some(user_agent) = options.get("user_agent") {
            builder = builder.user_agent(user_agent.to_string());
        }
        if options.get("no_proxy").map(str::trim) == Some("true") {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| EngineError::Init(format!("failed to create HTTP client: {}", e)))?;

        info!(directory = %directory.display(), timeout_secs, "Disk cache engine ready");

        // A concurrent init that won the race leaves equivalent state behind.
        let _ = self.state.set(DiskState {
            directory,
            client,
            timeout,
        });
        Ok(())
    }

    async fn lookup(&self, url: &str) -> CacheLookup {
        let path = self.path_for(url);
        if !self.is_initialized() {
            return CacheLookup::miss(path);
        }
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => CacheLookup::hit(path),
            _ => CacheLookup::miss(path),
        }
    }

    async fn download(&self, url: &str) -> Result<(), EngineError> {
        let state = self.state.get().ok_or(EngineError::NotInitialized)?;
        let dest = state.directory.join(cache_file_name(url));

        let response = state.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                EngineError::Timeout {
                    url: url.to_string(),
                    timeout_secs: state.timeout.as_secs(),
                }
            } else {
                EngineError::Download {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Download {
                url: url.to_string(),
                reason: format!("GET request failed with status {}", status),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| EngineError::Download {
                url: url.to_string(),
                reason: format!("Read error: {}", e),
            })?;

        let partial = partial_path(&dest, self.next_partial.fetch_add(1, Ordering::Relaxed));
        if let Err(e) = store(&partial, &dest, &body).await {
            if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        path = %partial.display(),
                        error = %cleanup,
                        "Failed to remove partial download"
                    );
                }
            }
            return Err(e);
        }

        debug!(url = %url, path = %dest.display(), bytes = body.len(), "Stored image");
        Ok(())
    }
}

impl CacheEngine for DiskCacheEngine {
    fn init<'a>(&'a self, options: &'a EngineOptions) -> BoxFuture<'a, Result<(), EngineError>> {
        Box::pin(self.init_state(options))
    }

    fn is_cached<'a>(&'a self, url: &'a str) -> BoxFuture<'a, CacheLookup> {
        Box::pin(self.lookup(url))
    }

    fn cache_file<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(), EngineError>> {
        Box::pin(self.download(url))
    }
}

/// File name a URL is cached under: SHA-256 hex plus the URL's extension.
pub(crate) fn cache_file_name(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    match url_extension(url) {
        Some(ext) => format!("{:x}.{}", digest, ext),
        None => format!("{:x}", digest),
    }
}

/// Extension of the last path segment, ignoring query and fragment.
fn url_extension(url: &str) -> Option<&str> {
    let without_suffix = url.split(|c: char| c == '?' || c == '#').next().unwrap_or(url);
    let path = match without_suffix.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, path)| path)?,
        None => without_suffix,
    };
    let file = path.rsplit('/').next()?;
    let (stem, ext) = file.rsplit_once('.')?;

    let valid = !stem.is_empty()
        && !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(ext)
}

/// Write `body` to `partial`, then move it over `dest`.
async fn store(partial: &Path, dest: &Path, body: &[u8]) -> Result<(), EngineError> {
    tokio::fs::write(partial, body)
        .await
        .map_err(|e| EngineError::Write {
            path: partial.to_path_buf(),
            source: e,
        })?;
    tokio::fs::rename(partial, dest)
        .await
        .map_err(|e| EngineError::Write {
            path: dest.to_path_buf(),
            source: e,
        })
}

/// Unique temporary path for one download of `dest`.
///
/// Partial names start with a dot; cache file names are hex digests and
/// never do.
fn partial_path(dest: &Path, sequence: u64) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(dest.file_name().unwrap_or_default());
    name.push(format!(".{}-{}{}", std::process::id(), sequence, PARTIAL_SUFFIX));
    dest.with_file_name(name)
}

fn is_partial_name(name: &std::ffi::OsStr) -> bool {
    let name = name.to_string_lossy();
    name.starts_with('.') && name.ends_with(PARTIAL_SUFFIX)
}
