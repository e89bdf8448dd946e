//! Shared pacing for every request of a crawl.
//!
//! The API throttles per client, so all workers go through one gate: it
//! keeps the single "not before" instant pushed forward by 429 responses,
//! and optionally a steady quota enforced with `governor`.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::fmt;
use std::num::NonZeroU32;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

use crate::config::ApiConfig;

/// Longest hold a single deferral can impose.
pub const MAX_DEFER: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Default)]
pub struct RequestGate {
    not_before: Mutex<Option<Instant>>,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl fmt::Debug for RequestGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestGate")
            .field("remaining", &self.remaining())
            .field("rate_limited", &self.limiter.is_some())
            .finish()
    }
}

impl RequestGate {
    /// A gate that only honors server-requested delays.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// A gate that also caps the request rate.
    #[must_use]
    pub fn per_second(rate: NonZeroU32) -> Self {
        Self {
            not_before: Mutex::new(None),
            limiter: Some(RateLimiter::direct(Quota::per_second(rate))),
        }
    }

    #[must_use]
    pub fn from_config(api: &ApiConfig) -> Self {
        api.requests_per_second
            .and_then(NonZeroU32::new)
            .map_or_else(Self::unlimited, Self::per_second)
    }

    /// Wait until a request may be sent.
    pub async fn ready(&self) {
        // Re-check after sleeping: another worker may have been throttled meanwhile.
        while let Some(until) = self.pending_until() {
            sleep_until(until).await;
        }
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Hold every request back for `wait` (at most [`MAX_DEFER`]), never
    /// shortening an earlier hold.
    pub fn defer(&self, wait: Duration) {
        let now = Instant::now();
        let until = now.checked_add(wait.min(MAX_DEFER)).unwrap_or(now);
        let mut not_before = self.not_before.lock().unwrap_or_else(PoisonError::into_inner);
        *not_before = Some(not_before.map_or(until, |current| current.max(until)));
    }

    /// Time left before the next request is permitted.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.pending_until()
            .map_or(Duration::ZERO, |until| {
                until.saturating_duration_since(Instant::now())
            })
    }

    fn pending_until(&self) -> Option<Instant> {
        let not_before = *self.not_before.lock().unwrap_or_else(PoisonError::into_inner);
        not_before.filter(|until| *until > Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ready_waits_out_deferral() {
        let gate = RequestGate::unlimited();
        gate.defer(Duration::from_secs(2));

        let started = Instant::now();
        gate.ready().await;
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(gate.remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_defer_never_shortens() {
        let gate = RequestGate::unlimited();
        gate.defer(Duration::from_secs(10));
        gate.defer(Duration::from_secs(1));
        assert!(gate.remaining() > Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_deferral_is_capped() {
        let gate = RequestGate::unlimited();
        gate.defer(Duration::from_secs(u64::MAX));

        let remaining = gate.remaining();
        assert!(remaining > Duration::from_secs(3600));
        assert!(remaining <= MAX_DEFER);

        gate.defer(Duration::MAX);
        assert!(gate.remaining() <= MAX_DEFER);
    }

    #[tokio::test]
    async fn test_ready_is_immediate_without_deferral() {
        let gate = RequestGate::unlimited();
        let started = Instant::now();
        gate.ready().await;
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_from_config_rate() {
        let mut api = ApiConfig::default();
        assert!(RequestGate::from_config(&api).limiter.is_none());

        api.requests_per_second = Some(3);
        assert!(RequestGate::from_config(&api).limiter.is_some());
    }
}
