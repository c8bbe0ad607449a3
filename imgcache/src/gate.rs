//! One-shot readiness gate for the cache engine.
//!
//! Every resolution waits on the gate before touching the engine. The gate
//! starts `Pending` and settles exactly once, to `Ready` when `init`
//! succeeded or `Failed` when it did not.
//!
//! # State Machine
//!
//! ```text
//! Pending --[engine init ok]----> Ready
//! Pending --[engine init error]--> Failed
//! ```
//!
//! Settled states are terminal. A failed gate is never retried; callers
//! decide what a failed engine means for them (see `GateFailurePolicy`).
//!
//! The gate is an ordinary value shared through `Arc`, so tests and
//! applications can run several independent gates side by side.

use tokio::sync::{watch, OnceCell};
use tracing::{debug, info, warn};

use crate::engine::{CacheEngine, EngineOptions};

/// Observable state of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    /// Engine initialization has not completed.
    Pending,
    /// Engine initialized successfully.
    Ready,
    /// Engine initialization failed.
    Failed,
}

/// Settled outcome delivered to waiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Engine initialized successfully.
    Ready,
    /// Engine initialization failed.
    Failed,
}

impl GateOutcome {
    /// Whether the engine is usable.
    pub fn is_ready(self) -> bool {
        matches!(self, GateOutcome::Ready)
    }
}

impl From<GateOutcome> for GateStatus {
    fn from(outcome: GateOutcome) -> Self {
        match outcome {
            GateOutcome::Ready => GateStatus::Ready,
            GateOutcome::Failed => GateStatus::Failed,
        }
    }
}

/// One-shot asynchronous readiness signal.
#[derive(Debug)]
pub struct ReadinessGate {
    status: watch::Sender<GateStatus>,
    init: OnceCell<GateOutcome>,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    /// Create a pending gate.
    pub fn new() -> Self {
        let (status, _) = watch::channel(GateStatus::Pending);
        Self {
            status,
            init: OnceCell::new(),
        }
    }

    /// Current status without waiting.
    pub fn status(&self) -> GateStatus {
        *self.status.borrow()
    }

    /// Initialize the engine and settle the gate with the result.
    ///
    /// Only the first call runs `engine.init`. Later or concurrent calls
    /// wait for that first initialization and return its outcome. If the
    /// running call is dropped before it settles the gate, the next waiting
    /// (or later) call takes over and runs `engine.init` itself.
    pub async fn initialize(
        &self,
        engine: &dyn CacheEngine,
        options: &EngineOptions,
    ) -> GateOutcome {
        if let Some(outcome) = self.settled() {
            debug!(outcome = ?outcome, "Cache engine already initialized");
            return outcome;
        }

        *self
            .init
            .get_or_init(|| self.run_init(engine, options))
            .await
    }

    async fn run_init(&self, engine: &dyn CacheEngine, options: &EngineOptions) -> GateOutcome {
        // Settled out of band while this call was queued.
        if let Some(outcome) = self.settled() {
            return outcome;
        }

        info!(options = options.len(), "Initializing cache engine");
        let outcome = match engine.init(options).await {
            Ok(()) => GateOutcome::Ready,
            Err(e) => {
                warn!(error = %e, "Cache engine failed to initialize");
                GateOutcome::Failed
            }
        };
        self.settle(outcome)
    }

    /// Settle the gate directly, for engines initialized out of band.
    ///
    /// The first settlement wins; later calls leave the gate untouched and
    /// return the outcome already in place.
    pub fn settle(&self, outcome: GateOutcome) -> GateOutcome {
        let changed = self.status.send_if_modified(|status| {
            if *status == GateStatus::Pending {
                *status = outcome.into();
                true
            } else {
                false
            }
        });

        if changed {
            info!(outcome = ?outcome, "Readiness gate settled");
            outcome
        } else {
            let current = self.settled().unwrap_or(outcome);
            debug!(ignored = ?outcome, current = ?current, "Readiness gate already settled");
            current
        }
    }

    /// Wait until the gate settles.
    ///
    /// Returns immediately once settled. Never triggers initialization.
    pub async fn await_ready(&self) -> GateOutcome {
        if let Some(outcome) = self.settled() {
            return outcome;
        }

        let mut rx = self.status.subscribe();
        let outcome = match rx
            .wait_for(|status| *status != GateStatus::Pending)
            .await
            .map(|status| *status)
        {
            Ok(GateStatus::Ready) => GateOutcome::Ready,
            // The sender lives as long as `self`, so `Err` cannot happen while
            // we hold a reference.
            _ => GateOutcome::Failed,
        };
        outcome
    }

    fn settled(&self) -> Option<GateOutcome> {
        match self.status() {
            GateStatus::Pending => None,
            GateStatus::Ready => Some(GateOutcome::Ready),
            GateStatus::Failed => Some(GateOutcome::Failed),
        }
    }
}
