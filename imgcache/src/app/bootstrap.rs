//! Service bootstrap.

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::info;

use super::config::AppConfig;
use super::error::AppError;
use crate::binding::{ImageBinding, ImageSink};
use crate::engine::{CacheEngine, EngineOptions};
use crate::gate::{GateOutcome, ReadinessGate};
use crate::resolver::{CacheRequest, ImageKind, Resolution, Resolver};

/// Owns the engine, the readiness gate and the resolver.
pub struct ImgCacheService {
    engine: Arc<dyn CacheEngine>,
    gate: Arc<ReadinessGate>,
    resolver: Resolver,
    options: EngineOptions,
}

impl fmt::Debug for ImgCacheService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImgCacheService")
            .field("gate", &self.gate.status())
            .field("resolver", &self.resolver)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ImgCacheService {
    /// Start the service around `engine`.
    ///
    /// Unless `config.manual_init` is set, engine initialization is spawned
    /// on the current Tokio runtime and resolutions wait for it through the
    /// gate.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NoRuntime` if automatic initialization is
    /// requested outside a Tokio runtime.
    pub fn start(config: AppConfig, engine: Arc<dyn CacheEngine>) -> Result<Self, AppError> {
        let gate = Arc::new(ReadinessGate::new());
        let resolver = Resolver::new(
            Arc::clone(&engine),
            Arc::clone(&gate),
            config.resolver.clone(),
        );

        let service = Self {
            engine,
            gate,
            resolver,
            options: config.engine_options,
        };

        if config.manual_init {
            info!("Manual initialization enabled, waiting for initialize()");
        } else {
            let handle = Handle::try_current().map_err(|_| AppError::NoRuntime)?;
            let engine = Arc::clone(&service.engine);
            let gate = Arc::clone(&service.gate);
            let options = service.options.clone();
            handle.spawn(async move {
                gate.initialize(engine.as_ref(), &options).await;
            });
        }

        Ok(service)
    }

    /// Initialize the engine explicitly.
    ///
    /// Safe to call any number of times, and alongside automatic
    /// initialization: the engine's `init` runs once per completed attempt.
    pub async fn initialize(&self) -> GateOutcome {
        self.gate
            .initialize(self.engine.as_ref(), &self.options)
            .await
    }

    /// Wait for the engine to finish initializing.
    pub async fn wait_ready(&self) -> GateOutcome {
        self.gate.await_ready().await
    }

    /// The readiness gate.
    pub fn gate(&self) -> &Arc<ReadinessGate> {
        &self.gate
    }

    /// The resolver.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// The cache engine.
    pub fn engine(&self) -> &Arc<dyn CacheEngine> {
        &self.engine
    }

    /// Create a latest-request-wins binding for a display target.
    pub fn binding<S: ImageSink + 'static>(&self, sink: Arc<S>) -> ImageBinding<S> {
        ImageBinding::new(self.resolver.clone(), sink)
    }

    /// Resolve a single URL.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidRequest` for an empty URL. Engine failures
    /// never surface here; they end in the original URL.
    pub async fn resolve(
        &self,
        url: impl Into<String>,
        kind: ImageKind,
    ) -> Result<Resolution, AppError> {
        let request = CacheRequest::new(url, kind)?;
        Ok(self.resolver.resolve(&request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BoxFuture, CacheLookup, EngineError};
    use crate::gate::GateStatus;
    use crate::resolver::{ResolveOutcome, ResolvedImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Engine with everything cached; counts `init` calls.
    #[derive(Default)]
    struct CountingEngine {
        init_calls: AtomicUsize,
        seen_options: parking_lot::Mutex<Option<EngineOptions>>,
    }

    impl CacheEngine for CountingEngine {
        fn init<'a>(
            &'a self,
            options: &'a EngineOptions,
        ) -> BoxFuture<'a, Result<(), EngineError>> {
            Box::pin(async move {
                self.init_calls.fetch_add(1, Ordering::SeqCst);
                *self.seen_options.lock() = Some(options.clone());
                Ok(())
            })
        }

        fn is_cached<'a>(&'a self, url: &'a str) -> BoxFuture<'a, CacheLookup> {
            Box::pin(async move { CacheLookup::hit(format!("/cache/{}", url.len())) })
        }

        fn cache_file<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<(), EngineError>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn test_start_initializes_automatically() {
        let engine = Arc::new(CountingEngine::default());
        let mut config = AppConfig::new("/tmp/unused");
        config.set_option("timeout_secs", "9");

        let service = ImgCacheService::start(config, engine.clone()).unwrap();

        assert_eq!(service.wait_ready().await, GateOutcome::Ready);
        assert_eq!(engine.init_calls.load(Ordering::SeqCst), 1);
        let seen = engine.seen_options.lock().clone().unwrap();
        assert_eq!(seen.get("timeout_secs"), Some("9"));

        // Explicit initialize after auto-init does not re-run init.
        assert_eq!(service.initialize().await, GateOutcome::Ready);
        assert_eq!(engine.init_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_manual_init_waits_for_initialize() {
        let engine = Arc::new(CountingEngine::default());
        let config = AppConfig::new("/tmp/unused").with_manual_init(true);
        let service = ImgCacheService::start(config, engine.clone()).unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(service.gate().status(), GateStatus::Pending);
        assert_eq!(engine.init_calls.load(Ordering::SeqCst), 0);

        assert_eq!(service.initialize().await, GateOutcome::Ready);
        assert_eq!(engine.init_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolve_through_service() {
        let engine = Arc::new(CountingEngine::default());
        let service = ImgCacheService::start(AppConfig::new("/tmp/unused"), engine).unwrap();

        let resolution = service
            .resolve("https://x/a.png", ImageKind::Direct)
            .await
            .unwrap();
        assert_eq!(resolution.outcome, ResolveOutcome::Hit);
        assert!(matches!(resolution.image, ResolvedImage::Cached(_)));
    }

    #[tokio::test]
    async fn test_resolve_empty_url_is_rejected() {
        let engine = Arc::new(CountingEngine::default());
        let service = ImgCacheService::start(AppConfig::new("/tmp/unused"), engine).unwrap();

        let result = service.resolve("", ImageKind::Direct).await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[test]
    fn test_auto_init_requires_runtime() {
        let engine = Arc::new(CountingEngine::default());
        let result = ImgCacheService::start(AppConfig::new("/tmp/unused"), engine);
        assert!(matches!(result, Err(AppError::NoRuntime)));
    }

    #[test]
    fn test_manual_init_without_runtime() {
        let engine = Arc::new(CountingEngine::default());
        let config = AppConfig::new("/tmp/unused").with_manual_init(true);
        let service = ImgCacheService::start(config, engine).unwrap();
        assert_eq!(service.gate().status(), GateStatus::Pending);
    }
}
