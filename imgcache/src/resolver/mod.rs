//! Cache-or-fallback resolution.
//!
//! The [`Resolver`] turns a remote image URL into something the caller can
//! display: a local cached copy when possible, the original URL otherwise.
//!
//! # Flow
//!
//! ```text
//! resolve(request)
//!     │
//!     ├── await readiness gate
//!     ├── is_cached(url) ── found ──► Cached(path)            [Hit]
//!     │
//!     └── retry loop (attempt = 1..)
//!             cache_file(url)
//!               ├── ok  ──► is_cached(url) ──► Cached(path)   [Succeeded]
//!               └── err ──► attempt <= max_attempts ? retry
//!                                                  : Original(url) [ExhaustedFallback]
//! ```
//!
//! Retries are immediate: no backoff, no jitter. Timeouts belong to the
//! engine. A broken cache never blocks the image from being shown; the
//! worst case is the original URL.

mod request;
mod state;

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::engine::CacheEngine;
use crate::gate::ReadinessGate;

pub use request::{CacheRequest, ImageKind, RequestError, ResolvedImage};
pub use state::{ResolveState, RetryState};

/// Default number of retries after the first failed download.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// What to do when the readiness gate settled as failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GateFailurePolicy {
    /// Query the engine anyway and run the normal retry loop.
    #[default]
    Proceed,
    /// Skip the engine and return the original URL straight away.
    Fallback,
}

impl GateFailurePolicy {
    /// Parse a config value (`proceed` or `fallback`, case-insensitive).
    pub fn from_config_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "proceed" => Some(GateFailurePolicy::Proceed),
            "fallback" => Some(GateFailurePolicy::Fallback),
            _ => None,
        }
    }
}

/// Resolver tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Retries allowed after the first failed download.
    pub max_attempts: u32,
    /// Behaviour after a failed engine initialization.
    pub on_gate_failure: GateFailurePolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            on_gate_failure: GateFailurePolicy::default(),
        }
    }
}

/// Terminal state a resolution reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// A cached copy already existed.
    Hit,
    /// The image was cached on attempt `attempts`.
    Succeeded { attempts: u32 },
    /// Every attempt failed; the original URL was returned.
    ExhaustedFallback { attempts: u32 },
    /// The engine failed to initialize and was skipped.
    SkippedAfterGateFailure,
}

impl ResolveOutcome {
    /// Number of `cache_file` calls made.
    pub fn attempts(&self) -> u32 {
        match self {
            ResolveOutcome::Hit | ResolveOutcome::SkippedAfterGateFailure => 0,
            ResolveOutcome::Succeeded { attempts }
            | ResolveOutcome::ExhaustedFallback { attempts } => *attempts,
        }
    }
}

/// Result of resolving one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The request that was resolved.
    pub request: CacheRequest,
    /// What the caller should display.
    pub image: ResolvedImage,
    /// How the resolution ended.
    pub outcome: ResolveOutcome,
}

impl Resolution {
    fn new(request: &CacheRequest, image: ResolvedImage, outcome: ResolveOutcome) -> Self {
        Self {
            request: request.clone(),
            image,
            outcome,
        }
    }

    fn fallback(request: &CacheRequest, outcome: ResolveOutcome) -> Self {
        Self::new(
            request,
            ResolvedImage::Original(request.url().to_string()),
            outcome,
        )
    }

    /// The resolved reference rendered for the request's [`ImageKind`].
    pub fn rendered(&self) -> String {
        self.request.kind().render(&self.image.reference())
    }
}

/// Drives the cache engine for individual requests.
///
/// Cheap to clone; clones share the engine and the gate.
#[derive(Clone)]
pub struct Resolver {
    engine: Arc<dyn CacheEngine>,
    gate: Arc<ReadinessGate>,
    config: ResolverConfig,
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("gate", &self.gate.status())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Create a resolver.
    ///
    /// # Arguments
    ///
    /// * `engine` - The cache engine to drive
    /// * `gate` - Readiness gate settled by the engine's initialization
    /// * `config` - Retry and gate-failure settings
    pub fn new(
        engine: Arc<dyn CacheEngine>,
        gate: Arc<ReadinessGate>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            engine,
            gate,
            config,
        }
    }

    /// The readiness gate this resolver waits on.
    pub fn gate(&self) -> &Arc<ReadinessGate> {
        &self.gate
    }

    /// Current settings.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a request to a cached path or the original URL.
    ///
    /// Never fails: engine errors are absorbed by the retry loop and end in
    /// the original URL at worst.
    pub async fn resolve(&self, request: &CacheRequest) -> Resolution {
        let url = request.url();

        debug!(url = %url, state = %ResolveState::AwaitingGate, "Waiting for cache engine");
        let gate = self.gate.await_ready().await;
        if !gate.is_ready() {
            match self.config.on_gate_failure {
                GateFailurePolicy::Proceed => {
                    warn!(url = %url, "Cache engine failed to initialize, checking cache anyway");
                }
                GateFailurePolicy::Fallback => {
                    warn!(url = %url, "Cache engine failed to initialize, using original image");
                    return Resolution::fallback(request, ResolveOutcome::SkippedAfterGateFailure);
                }
            }
        }

        debug!(url = %url, state = %ResolveState::CheckingCache, "Checking cache");
        let lookup = self.engine.is_cached(url).await;
        if lookup.found {
            info!(
                url = %url,
                kind = %request.kind(),
                path = %lookup.path.display(),
                state = %ResolveState::HitResolved,
                "Fetching cached image"
            );
            return Resolution::new(request, ResolvedImage::Cached(lookup.path), ResolveOutcome::Hit);
        }

        self.cache_with_retries(request).await
    }

    /// Resolve several requests concurrently.
    ///
    /// Each request runs its own independent resolution; identical URLs are
    /// not deduplicated. Results are returned in request order.
    pub async fn resolve_all(&self, requests: &[CacheRequest]) -> Vec<Resolution> {
        join_all(requests.iter().map(|request| self.resolve(request))).await
    }

    async fn cache_with_retries(&self, request: &CacheRequest) -> Resolution {
        let url = request.url();
        let mut retry = RetryState::new(request, self.config.max_attempts);

        loop {
            let attempt = retry.attempt();
            debug!(url = %url, attempt, state = %ResolveState::Retrying, "Caching image");

            match self.engine.cache_file(url).await {
                Ok(()) => {
                    info!(
                        url = %url,
                        attempt,
                        state = %ResolveState::Succeeded,
                        "Successfully cached image"
                    );
                    // Re-query so the path comes from the same accessor as a hit.
                    let lookup = self.engine.is_cached(url).await;
                    if !lookup.found {
                        warn!(
                            url = %url,
                            path = %lookup.path.display(),
                            "Cached image not visible after caching, using reported path"
                        );
                    }
                    return Resolution::new(
                        request,
                        ResolvedImage::Cached(lookup.path),
                        ResolveOutcome::Succeeded { attempts: attempt },
                    );
                }
                Err(e) => {
                    warn!(error = %e, url = %url, attempt, "Failed to cache image");
                    if !retry.record_failure() {
                        warn!(
                            url = %url,
                            attempt,
                            state = %ResolveState::ExhaustedFallback,
                            "Giving up caching image, using original"
                        );
                        return Resolution::fallback(
                            request,
                            ResolveOutcome::ExhaustedFallback { attempts: attempt },
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BoxFuture, CacheLookup, EngineError, EngineOptions};
    use crate::gate::GateOutcome;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::path::PathBuf;

    /// Engine that fails `cache_file` a fixed number of times per URL.
    #[derive(Default)]
    struct ScriptedEngine {
        cached: Mutex<HashSet<String>>,
        failures_before_success: Option<u32>,
        cache_file_calls: Mutex<Vec<String>>,
        lookups: Mutex<Vec<String>>,
    }

    impl ScriptedEngine {
        fn failing_times(n: u32) -> Self {
            Self {
                failures_before_success: Some(n),
                ..Default::default()
            }
        }

        fn always_failing() -> Self {
            Self::default()
        }

        fn with_cached(self, url: &str) -> Self {
            self.cached.lock().insert(url.to_string());
            self
        }

        fn path(url: &str) -> PathBuf {
            PathBuf::from("/cache").join(url.rsplit('/').next().unwrap_or("image"))
        }

        fn cache_file_calls(&self) -> usize {
            self.cache_file_calls.lock().len()
        }
    }

    impl CacheEngine for ScriptedEngine {
        fn init<'a>(
            &'a self,
            _options: &'a EngineOptions,
        ) -> BoxFuture<'a, Result<(), EngineError>> {
            Box::pin(async { Ok(()) })
        }

        fn is_cached<'a>(&'a self, url: &'a str) -> BoxFuture<'a, CacheLookup> {
            Box::pin(async move {
                self.lookups.lock().push(url.to_string());
                if self.cached.lock().contains(url) {
                    CacheLookup::hit(Self::path(url))
                } else {
                    CacheLookup::miss(Self::path(url))
                }
            })
        }

        fn cache_file<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(), EngineError>> {
            Box::pin(async move {
                let mut calls = self.cache_file_calls.lock();
                calls.push(url.to_string());
                let attempt = calls.len() as u32;
                drop(calls);

                match self.failures_before_success {
                    Some(n) if attempt > n => {
                        self.cached.lock().insert(url.to_string());
                        Ok(())
                    }
                    _ => Err(EngineError::Download {
                        url: url.to_string(),
                        reason: "connection reset".to_string(),
                    }),
                }
            })
        }
    }

    fn resolver_with(engine: Arc<ScriptedEngine>, outcome: GateOutcome) -> Resolver {
        let gate = Arc::new(ReadinessGate::new());
        gate.settle(outcome);
        Resolver::new(engine, gate, ResolverConfig::default())
    }

    #[test]
    fn test_gate_failure_policy_from_config_str() {
        assert_eq!(
            GateFailurePolicy::from_config_str("Proceed"),
            Some(GateFailurePolicy::Proceed)
        );
        assert_eq!(
            GateFailurePolicy::from_config_str(" fallback "),
            Some(GateFailurePolicy::Fallback)
        );
        assert_eq!(GateFailurePolicy::from_config_str("skip"), None);
    }

    #[test]
    fn test_resolver_config_default() {
        let config = ResolverConfig::default();
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.on_gate_failure, GateFailurePolicy::Proceed);
    }

    #[tokio::test]
    async fn test_hit_makes_no_cache_file_calls() {
        let engine = Arc::new(ScriptedEngine::always_failing().with_cached("https://x/a.png"));
        let resolver = resolver_with(Arc::clone(&engine), GateOutcome::Ready);

        let request = CacheRequest::direct("https://x/a.png").unwrap();
        let resolution = resolver.resolve(&request).await;

        assert_eq!(resolution.outcome, ResolveOutcome::Hit);
        assert_eq!(
            resolution.image,
            ResolvedImage::Cached(PathBuf::from("/cache/a.png"))
        );
        assert_eq!(engine.cache_file_calls(), 0);
    }

    #[tokio::test]
    async fn test_fail_twice_then_succeed() {
        let engine = Arc::new(ScriptedEngine::failing_times(2));
        let resolver = resolver_with(Arc::clone(&engine), GateOutcome::Ready);

        let request = CacheRequest::direct("https://x/a.png").unwrap();
        let resolution = resolver.resolve(&request).await;

        assert_eq!(resolution.outcome, ResolveOutcome::Succeeded { attempts: 3 });
        assert_eq!(
            resolution.image,
            ResolvedImage::Cached(PathBuf::from("/cache/a.png"))
        );
        assert_eq!(engine.cache_file_calls(), 3);
    }

    #[tokio::test]
    async fn test_always_failing_falls_back_after_three_attempts() {
        let engine = Arc::new(ScriptedEngine::always_failing());
        let resolver = resolver_with(Arc::clone(&engine), GateOutcome::Ready);

        let request = CacheRequest::direct("https://x/a.png").unwrap();
        let resolution = resolver.resolve(&request).await;

        assert_eq!(
            resolution.outcome,
            ResolveOutcome::ExhaustedFallback { attempts: 3 }
        );
        assert_eq!(
            resolution.image,
            ResolvedImage::Original("https://x/a.png".to_string())
        );
        assert_eq!(engine.cache_file_calls(), 3);
    }

    #[tokio::test]
    async fn test_success_requeries_path() {
        let engine = Arc::new(ScriptedEngine::failing_times(0));
        let resolver = resolver_with(Arc::clone(&engine), GateOutcome::Ready);

        let request = CacheRequest::direct("https://x/a.png").unwrap();
        resolver.resolve(&request).await;

        // Initial check plus the post-success re-query.
        assert_eq!(engine.lookups.lock().len(), 2);
        assert_eq!(engine.cache_file_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_gate_proceeds_by_default() {
        let engine = Arc::new(ScriptedEngine::always_failing().with_cached("https://x/a.png"));
        let resolver = resolver_with(Arc::clone(&engine), GateOutcome::Failed);

        let request = CacheRequest::direct("https://x/a.png").unwrap();
        let resolution = resolver.resolve(&request).await;

        assert_eq!(resolution.outcome, ResolveOutcome::Hit);
    }

    #[tokio::test]
    async fn test_failed_gate_fallback_policy_skips_engine() {
        let engine = Arc::new(ScriptedEngine::always_failing());
        let gate = Arc::new(ReadinessGate::new());
        gate.settle(GateOutcome::Failed);
        let config = ResolverConfig {
            on_gate_failure: GateFailurePolicy::Fallback,
            ..Default::default()
        };
        let resolver = Resolver::new(engine.clone(), gate, config);

        let request = CacheRequest::background("https://x/a.png").unwrap();
        let resolution = resolver.resolve(&request).await;

        assert_eq!(resolution.outcome, ResolveOutcome::SkippedAfterGateFailure);
        assert_eq!(resolution.rendered(), "url(https://x/a.png)");
        assert!(engine.lookups.lock().is_empty());
        assert_eq!(engine.cache_file_calls(), 0);
    }

    #[tokio::test]
    async fn test_resolve_waits_for_gate() {
        let engine = Arc::new(ScriptedEngine::always_failing().with_cached("https://x/a.png"));
        let gate = Arc::new(ReadinessGate::new());
        let resolver = Resolver::new(engine.clone(), Arc::clone(&gate), ResolverConfig::default());

        let handle = tokio::spawn(async move {
            let request = CacheRequest::direct("https://x/a.png").unwrap();
            resolver.resolve(&request).await
        });

        tokio::task::yield_now().await;
        assert!(engine.lookups.lock().is_empty(), "no lookup before the gate settles");

        gate.settle(GateOutcome::Ready);
        let resolution = handle.await.unwrap();
        assert_eq!(resolution.outcome, ResolveOutcome::Hit);
    }

    #[test]
    fn test_outcome_attempts() {
        assert_eq!(ResolveOutcome::Hit.attempts(), 0);
        assert_eq!(ResolveOutcome::Succeeded { attempts: 2 }.attempts(), 2);
        assert_eq!(ResolveOutcome::ExhaustedFallback { attempts: 3 }.attempts(), 3);
        assert_eq!(ResolveOutcome::SkippedAfterGateFailure.attempts(), 0);
    }
}
