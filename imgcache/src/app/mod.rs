//! Application bootstrap and lifecycle management.
//!
//! This module provides [`ImgCacheService`], which wires the cache engine,
//! the readiness gate and the resolver together in the right order:
//!
//! 1. Create the readiness gate (pending)
//! 2. Create the resolver sharing the engine and the gate
//! 3. Start engine initialization, unless `manual_init` is set
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                     ImgCacheService                        │
//! │                                                            │
//! │  CacheEngine ──init(options)──► ReadinessGate              │
//! │       ▲                              │                     │
//! │       │ is_cached / cache_file       │ await_ready         │
//! │       └────────────── Resolver ◄─────┘                     │
//! │                          │                                 │
//! │                          └──► ImageBinding ──► ImageSink   │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use imgcache::app::{AppConfig, ImgCacheService};
//! use imgcache::engine::DiskCacheEngine;
//! use imgcache::resolver::ImageKind;
//!
//! let config = AppConfig::default();
//! let engine = Arc::new(DiskCacheEngine::new(&config.cache_directory));
//! let service = ImgCacheService::start(config, engine)?;
//! let resolution = service.resolve("https://example.com/a.png", ImageKind::Direct).await?;
//! println!("{}", resolution.image);
//! ```

mod bootstrap;
mod config;
mod error;

pub use bootstrap::ImgCacheService;
pub use config::AppConfig;
pub use error::AppError;
