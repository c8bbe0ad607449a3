//! Cache engine abstraction.
//!
//! The orchestration layer (gate, resolver, binding) never touches storage
//! directly. It drives a [`CacheEngine`] through three operations:
//!
//! - `init` - one-time engine setup, fed by the opaque [`EngineOptions`] bag
//! - `is_cached` - pure lookup returning the local path and whether it exists
//! - `cache_file` - download and persist a remote resource
//!
//! # Providers
//!
//! - [`DiskCacheEngine`]: stores images under a local directory, fetched with `reqwest`
//!
//! Tests drive the orchestration layer with scripted in-process engines.

mod disk;
mod options;
mod traits;

pub use disk::{DiskCacheEngine, DiskCacheStats, DEFAULT_TIMEOUT_SECS};
pub use options::EngineOptions;
pub use traits::{BoxFuture, CacheEngine, CacheLookup, EngineError};
