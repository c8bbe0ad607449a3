//! Per-request retry bookkeeping and resolution states.

use std::fmt;

use super::request::CacheRequest;

/// States a single resolution moves through.
///
/// ```text
/// AwaitingGate -> CheckingCache -> HitResolved
///                               -> Retrying -> Succeeded
///                                           -> ExhaustedFallback
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveState {
    /// Waiting for the readiness gate.
    AwaitingGate,
    /// Asking the engine whether a copy exists.
    CheckingCache,
    /// A cached copy existed.
    HitResolved,
    /// Downloading into the cache.
    Retrying,
    /// A download attempt succeeded.
    Succeeded,
    /// Every attempt failed; the original URL is used.
    ExhaustedFallback,
}

impl fmt::Display for ResolveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolveState::AwaitingGate => "awaiting_gate",
            ResolveState::CheckingCache => "checking_cache",
            ResolveState::HitResolved => "hit_resolved",
            ResolveState::Retrying => "retrying",
            ResolveState::Succeeded => "succeeded",
            ResolveState::ExhaustedFallback => "exhausted_fallback",
        };
        f.write_str(name)
    }
}

/// Attempt counter for one in-flight download loop.
///
/// `max_attempts` bounds the retries after the first attempt: a retry is
/// allowed while `attempt <= max_attempts`, so `max_attempts + 1` attempts
/// are made in total before giving up.
#[derive(Debug, Clone)]
pub struct RetryState<'a> {
    request: &'a CacheRequest,
    attempt: u32,
    max_attempts: u32,
}

impl<'a> RetryState<'a> {
    /// Start at attempt 1.
    pub fn new(request: &'a CacheRequest, max_attempts: u32) -> Self {
        Self {
            request,
            attempt: 1,
            max_attempts,
        }
    }

    /// The request being retried.
    pub fn request(&self) -> &'a CacheRequest {
        self.request
    }

    /// Current attempt number (1-based).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Configured retry bound.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Record a failed attempt.
    ///
    /// Returns `true` and advances to the next attempt if another one is
    /// allowed, `false` once retries are exhausted.
    pub fn record_failure(&mut self) -> bool {
        if self.attempt <= self.max_attempts {
            self.attempt += 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_state_allows_max_plus_one_attempts() {
        let request = CacheRequest::direct("https://x/a.png").unwrap();
        let mut state = RetryState::new(&request, 2);

        assert_eq!(state.attempt(), 1);
        assert!(state.record_failure());
        assert_eq!(state.attempt(), 2);
        assert!(state.record_failure());
        assert_eq!(state.attempt(), 3);
        assert!(!state.record_failure());
        assert_eq!(state.attempt(), 3);
    }

    #[test]
    fn test_retry_state_zero_max_is_single_attempt() {
        let request = CacheRequest::direct("https://x/a.png").unwrap();
        let mut state = RetryState::new(&request, 0);
        assert!(!state.record_failure());
        assert_eq!(state.attempt(), 1);
        assert_eq!(state.request().url(), "https://x/a.png");
    }

    #[test]
    fn test_resolve_state_display() {
        assert_eq!(ResolveState::ExhaustedFallback.to_string(), "exhausted_fallback");
        assert_eq!(ResolveState::AwaitingGate.to_string(), "awaiting_gate");
    }
}
