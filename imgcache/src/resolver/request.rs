//! Resolution requests and their results.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors building a [`CacheRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The URL was empty or whitespace.
    #[error("Image URL must not be empty")]
    EmptyUrl,
}

/// How the resolved reference will be consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    /// Used as a background image (`url(...)` style value).
    Background,
    /// Used directly as the image source.
    Direct,
}

impl ImageKind {
    /// Render a resolved reference for this kind of consumer.
    ///
    /// Background images are wrapped as `url(<reference>)`; direct sources
    /// are used as-is.
    pub fn render(self, reference: &str) -> String {
        match self {
            ImageKind::Background => format!("url({})", reference),
            ImageKind::Direct => reference.to_string(),
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            ImageKind::Background => 0,
            ImageKind::Direct => 1,
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageKind::Background => write!(f, "background"),
            ImageKind::Direct => write!(f, "direct"),
        }
    }
}

/// One image to resolve. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRequest {
    url: String,
    kind: ImageKind,
}

impl CacheRequest {
    /// Build a request, rejecting empty URLs.
    pub fn new(url: impl Into<String>, kind: ImageKind) -> Result<Self, RequestError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(RequestError::EmptyUrl);
        }
        Ok(Self { url, kind })
    }

    /// Shorthand for a [`ImageKind::Direct`] request.
    pub fn direct(url: impl Into<String>) -> Result<Self, RequestError> {
        Self::new(url, ImageKind::Direct)
    }

    /// Shorthand for a [`ImageKind::Background`] request.
    pub fn background(url: impl Into<String>) -> Result<Self, RequestError> {
        Self::new(url, ImageKind::Background)
    }

    /// The remote URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// How the result will be consumed.
    pub fn kind(&self) -> ImageKind {
        self.kind
    }
}

/// The reference handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedImage {
    /// A local cached copy.
    Cached(PathBuf),
    /// The original remote URL, used when caching was not possible.
    Original(String),
}

impl ResolvedImage {
    /// Whether the image is served from the local cache.
    pub fn is_cached(&self) -> bool {
        matches!(self, ResolvedImage::Cached(_))
    }

    /// Local path, if cached.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ResolvedImage::Cached(path) => Some(path),
            ResolvedImage::Original(_) => None,
        }
    }

    /// The reference as a string, suitable for rendering.
    pub fn reference(&self) -> String {
        match self {
            ResolvedImage::Cached(path) => path.to_string_lossy().into_owned(),
            ResolvedImage::Original(url) => url.clone(),
        }
    }
}

impl fmt::Display for ResolvedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedImage::Cached(path) => write!(f, "{}", path.display()),
            ResolvedImage::Original(url) => write!(f, "{}", url),
        }
    }
}
