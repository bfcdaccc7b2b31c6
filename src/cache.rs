//! Short-lived in-memory response cache.
//!
//! Entries expire individually: a read after an entry's TTL has elapsed treats
//! it as absent and drops it. There is no size bound and no background sweep.

use dashmap::DashMap;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Default time-to-live for cached responses.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    inserted_at: Instant,
}

/// Concurrent map of JSON values with per-entry expiry.
///
/// Two concurrent misses on the same key may both fetch and both store; the
/// last write wins.
#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl ResponseCache {
    /// Creates an empty cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Returns the value stored under `key` if it has not expired.
    pub fn get(&self, key: &str) -> Option<Value> {
        {
            let entry = self.entries.get(key)?;
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.value.clone());
            }
        }

        // The read guard must be released before removing.
        self.entries
            .remove_if(key, |_, entry| entry.inserted_at.elapsed() >= self.ttl);
        None
    }

    /// Stores `value` under `key`, restarting its TTL.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Number of stored entries, expired ones included until they are read.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured time-to-live.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
