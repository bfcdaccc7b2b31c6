//! Sliding-window rate limiting per client.

use crate::config::RateLimitConfig;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Checks between sweeps of idle clients.
const PRUNE_EVERY: u64 = 1024;

/// Outcome of recording one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// The request fits in the window.
    Allowed {
        /// Requests still available in the current window.
        remaining: u32,
        /// Unix timestamp (seconds) when the oldest request leaves the window.
        reset: u64,
    },
    /// The window is full.
    Limited {
        /// Unix timestamp (seconds) when a slot frees up.
        reset: u64,
        /// Seconds until a slot frees up.
        retry_after: u64,
    },
}

/// Rate limiter using sliding window algorithm.
#[derive(Debug)]
pub struct RateLimiter {
    /// Request timestamps (ms) per client.
    windows: DashMap<String, VecDeque<u64>>,
    window_ms: u64,
    max_requests: u32,
    checks: AtomicU64,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

impl RateLimiter {
    /// Create a limiter allowing `max_requests` per `window`.
    #[must_use]
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            windows: DashMap::new(),
            window_ms: window.as_millis() as u64,
            max_requests,
            checks: AtomicU64::new(0),
        }
    }

    /// Create a limiter from configuration.
    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.window(), config.max_requests)
    }

    /// Requests allowed per window.
    #[must_use]
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Check whether `client` may make a request now, recording it if so.
    pub fn check_and_record(&self, client: &str) -> RateDecision {
        self.check_and_record_at(client, now_millis())
    }

    fn check_and_record_at(&self, client: &str, now: u64) -> RateDecision {
        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune_at(now);
        }

        let window_start = now.saturating_sub(self.window_ms);

        let mut entry = self.windows.entry(client.to_string()).or_default();
        let window = entry.value_mut();

        // Remove old entries outside the window
        while let Some(&front) = window.front() {
            if front <= window_start {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() < self.max_requests as usize {
            window.push_back(now);
            let oldest = window.front().copied().unwrap_or(now);
            RateDecision::Allowed {
                remaining: self.max_requests - window.len() as u32,
                reset: (oldest + self.window_ms).div_ceil(1000),
            }
        } else {
            let frees_at = window.front().copied().unwrap_or(now) + self.window_ms;
            RateDecision::Limited {
                reset: frees_at.div_ceil(1000),
                retry_after: (frees_at - now).div_ceil(1000).max(1),
            }
        }
    }

    /// Clear rate limit data for a client.
    pub fn clear(&self, client: &str) {
        self.windows.remove(client);
    }

    /// Drops clients with no request inside the current window.
    pub fn prune(&self) {
        self.prune_at(now_millis());
    }

    fn prune_at(&self, now: u64) {
        let window_start = now.saturating_sub(self.window_ms);
        self.windows
            .retain(|_, window| window.back().is_some_and(|&last| last > window_start));
    }

    /// Number of clients currently tracked.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 3);

        for expected_remaining in [2, 1, 0] {
            match limiter.check_and_record_at("1.1.1.1", 1_000_000) {
                RateDecision::Allowed { remaining, .. } => {
                    assert_eq!(remaining, expected_remaining)
                }
                other => panic!("unexpected {:?}", other),
            }
        }

        assert!(matches!(
            limiter.check_and_record_at("1.1.1.1", 1_000_000),
            RateDecision::Limited { .. }
        ));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);

        assert!(matches!(
            limiter.check_and_record_at("a", 1_000),
            RateDecision::Allowed { .. }
        ));
        assert!(matches!(
            limiter.check_and_record_at("b", 1_000),
            RateDecision::Allowed { .. }
        ));
        assert!(matches!(
            limiter.check_and_record_at("a", 1_000),
            RateDecision::Limited { .. }
        ));
    }

    #[test]
    fn test_window_slides() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);

        limiter.check_and_record_at("a", 10_000);
        match limiter.check_and_record_at("a", 40_000) {
            RateDecision::Limited { reset, retry_after } => {
                assert_eq!(reset, 70);
                assert_eq!(retry_after, 30);
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(
            limiter.check_and_record_at("a", 70_000),
            RateDecision::Allowed { .. }
        ));
    }

    #[test]
    fn test_clear() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        limiter.check_and_record_at("a", 1_000);
        limiter.clear("a");
        assert!(matches!(
            limiter.check_and_record_at("a", 1_000),
            RateDecision::Allowed { .. }
        ));
    }

    #[test]
    fn test_prune_drops_idle_clients() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 5);
        limiter.check_and_record_at("idle", 1_000);
        limiter.check_and_record_at("active", 50_000);

        limiter.prune_at(61_000);

        assert_eq!(limiter.tracked_clients(), 1);
        assert!(matches!(
            limiter.check_and_record_at("active", 61_000),
            RateDecision::Allowed { remaining: 3, .. }
        ));
    }

    #[test]
    fn test_idle_clients_are_swept_automatically() {
        let limiter = RateLimiter::new(Duration::from_secs(1), 1);

        // Each client shows up once, one second after the previous one.
        for i in 0..(PRUNE_EVERY * 3) {
            limiter.check_and_record_at(&format!("10.0.{}.{}", i / 256, i % 256), i * 1_000);
        }

        assert!(limiter.tracked_clients() <= PRUNE_EVERY as usize);
    }

    #[test]
    fn test_from_config() {
        let limiter = RateLimiter::from_config(&RateLimitConfig::default());
        assert_eq!(limiter.max_requests(), 100);
    }
}
