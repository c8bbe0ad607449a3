//! Latest-request-wins application of resolved images to a display target.
//!
//! A target (an image element, a widget, a sprite...) may ask for a new URL
//! before the previous resolution finished. Resolutions are never cancelled,
//! so without coordination a slow, stale resolution could overwrite a newer
//! one. [`ImageBinding`] keeps a generation counter per [`ImageKind`]: each
//! `bind` bumps the counter, and a finished resolution reaches the sink only
//! if its generation is still current.
//!
//! Background and direct images are tracked separately, so changing one
//! never discards the other.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::resolver::{CacheRequest, ImageKind, RequestError, Resolution, Resolver};

/// Receives rendered image references for one display target.
pub trait ImageSink: Send + Sync {
    /// Apply a rendered reference.
    ///
    /// `value` is already rendered for `kind` (see [`ImageKind::render`]).
    fn apply(&self, kind: ImageKind, value: &str);
}

/// What happened to a bound resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// The resolution was current and reached the sink.
    Applied(Resolution),
    /// A newer bind for the same kind superseded it; the sink was not touched.
    Superseded(Resolution),
}

impl BindOutcome {
    /// Whether the sink received this resolution.
    pub fn is_applied(&self) -> bool {
        matches!(self, BindOutcome::Applied(_))
    }

    /// The underlying resolution.
    pub fn resolution(&self) -> &Resolution {
        match self {
            BindOutcome::Applied(r) | BindOutcome::Superseded(r) => r,
        }
    }
}

/// Binds resolved images to a single sink.
pub struct ImageBinding<S: ImageSink + 'static> {
    resolver: Resolver,
    sink: Arc<S>,
    generations: Arc<Mutex<[u64; 2]>>,
}

impl<S: ImageSink + 'static> fmt::Debug for ImageBinding<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBinding")
            .field("generations", &*self.generations.lock())
            .finish_non_exhaustive()
    }
}

impl<S: ImageSink + 'static> ImageBinding<S> {
    /// Create a binding for `sink`.
    pub fn new(resolver: Resolver, sink: Arc<S>) -> Self {
        Self {
            resolver,
            sink,
            generations: Arc::new(Mutex::new([0; 2])),
        }
    }

    /// The sink results are applied to.
    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    /// Current generation for `kind` (0 before the first bind).
    pub fn generation(&self, kind: ImageKind) -> u64 {
        self.generations.lock()[kind.index()]
    }

    /// Start resolving `url` for `kind`, superseding earlier binds of that kind.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::EmptyUrl` for an empty URL; the current
    /// generation is left untouched in that case.
    pub fn bind(
        &self,
        url: impl Into<String>,
        kind: ImageKind,
    ) -> Result<JoinHandle<BindOutcome>, RequestError> {
        let request = CacheRequest::new(url, kind)?;
        let generation = {
            let mut generations = self.generations.lock();
            generations[kind.index()] += 1;
            generations[kind.index()]
        };

        let resolver = self.resolver.clone();
        let sink = Arc::clone(&self.sink);
        let generations = Arc::clone(&self.generations);

        Ok(tokio::spawn(async move {
            let resolution = resolver.resolve(&request).await;

            // Apply under the lock so a newer bind cannot slip in between
            // the generation check and the sink update.
            let generations = generations.lock();
            let current = generations[kind.index()];
            if current == generation {
                sink.apply(kind, &resolution.rendered());
                BindOutcome::Applied(resolution)
            } else {
                debug!(
                    url = %request.url(),
                    kind = %kind,
                    generation,
                    current,
                    "Discarding superseded image resolution"
                );
                BindOutcome::Superseded(resolution)
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BoxFuture, CacheEngine, CacheLookup, EngineError, EngineOptions};
    use crate::gate::{GateOutcome, ReadinessGate};
    use crate::resolver::ResolverConfig;
    use std::collections::HashMap;
    use tokio::sync::Notify;

    /// Engine where every URL is cached, and chosen URLs block until released.
    #[derive(Default)]
    struct GatedLookupEngine {
        blocked: Mutex<HashMap<String, Arc<Notify>>>,
    }

    impl GatedLookupEngine {
        fn block(&self, url: &str) -> Arc<Notify> {
            let notify = Arc::new(Notify::new());
            self.blocked
                .lock()
                .insert(url.to_string(), Arc::clone(&notify));
            notify
        }
    }

    impl CacheEngine for GatedLookupEngine {
        fn init<'a>(
            &'a self,
            _options: &'a EngineOptions,
        ) -> BoxFuture<'a, Result<(), EngineError>> {
            Box::pin(async { Ok(()) })
        }

        fn is_cached<'a>(&'a self, url: &'a str) -> BoxFuture<'a, CacheLookup> {
            Box::pin(async move {
                let blocker = self.blocked.lock().get(url).cloned();
                if let Some(notify) = blocker {
                    notify.notified().await;
                }
                CacheLookup::hit(format!("/cache/{}", url.rsplit('/').next().unwrap_or("")))
            })
        }

        fn cache_file<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<(), EngineError>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        applied: Mutex<Vec<(ImageKind, String)>>,
    }

    impl ImageSink for RecordingSink {
        fn apply(&self, kind: ImageKind, value: &str) {
            self.applied.lock().push((kind, value.to_string()));
        }
    }

    fn binding(engine: Arc<GatedLookupEngine>) -> ImageBinding<RecordingSink> {
        let gate = Arc::new(ReadinessGate::new());
        gate.settle(GateOutcome::Ready);
        let resolver = Resolver::new(engine, gate, ResolverConfig::default());
        ImageBinding::new(resolver, Arc::new(RecordingSink::default()))
    }

    #[tokio::test]
    async fn test_bind_applies_rendered_value() {
        let binding = binding(Arc::new(GatedLookupEngine::default()));

        let outcome = binding
            .bind("https://x/a.png", ImageKind::Background)
            .unwrap()
            .await
            .unwrap();

        assert!(outcome.is_applied());
        assert_eq!(
            *binding.sink().applied.lock(),
            vec![(ImageKind::Background, "url(/cache/a.png)".to_string())]
        );
    }

    #[tokio::test]
    async fn test_stale_resolution_is_discarded() {
        let engine = Arc::new(GatedLookupEngine::default());
        let release_old = engine.block("https://x/old.png");
        let binding = binding(Arc::clone(&engine));

        let old = binding.bind("https://x/old.png", ImageKind::Direct).unwrap();
        let new = binding.bind("https://x/new.png", ImageKind::Direct).unwrap();

        let new_outcome = new.await.unwrap();
        assert!(new_outcome.is_applied());

        release_old.notify_one();
        let old_outcome = old.await.unwrap();
        assert!(!old_outcome.is_applied());
        assert_eq!(
            old_outcome.resolution().request.url(),
            "https://x/old.png"
        );

        assert_eq!(
            *binding.sink().applied.lock(),
            vec![(ImageKind::Direct, "/cache/new.png".to_string())]
        );
        assert_eq!(binding.generation(ImageKind::Direct), 2);
    }

    #[tokio::test]
    async fn test_kinds_do_not_supersede_each_other() {
        let engine = Arc::new(GatedLookupEngine::default());
        let release = engine.block("https://x/bg.png");
        let binding = binding(Arc::clone(&engine));

        let bg = binding.bind("https://x/bg.png", ImageKind::Background).unwrap();
        let src = binding.bind("https://x/src.png", ImageKind::Direct).unwrap();

        assert!(src.await.unwrap().is_applied());
        release.notify_one();
        assert!(bg.await.unwrap().is_applied());

        assert_eq!(binding.sink().applied.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_url_rejected_without_bumping_generation() {
        let binding = binding(Arc::new(GatedLookupEngine::default()));

        let result = binding.bind("", ImageKind::Direct);
        assert!(matches!(result, Err(RequestError::EmptyUrl)));
        assert_eq!(binding.generation(ImageKind::Direct), 0);
    }
}
