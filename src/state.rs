//! Application state management.

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::db::{
    ActivityStore, DatabasePool, FeedbackStore, MemoryActivityStore, MemoryFeedbackStore,
    NewActivity, PgActivityStore, PgFeedbackStore,
};
use crate::rate_limit::RateLimiter;
use market_client::{KeyRotator, MarketClient};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Upstream market-data client.
    pub market: MarketClient,
    /// Activity log storage.
    pub activity: Arc<dyn ActivityStore>,
    /// Feedback storage.
    pub feedback: Arc<dyn FeedbackStore>,
    /// Response cache for the top-fifty listing.
    pub cache: Arc<ResponseCache>,
    /// Inbound per-IP rate limiter.
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Creates state on the in-memory stores.
    #[must_use]
    pub fn new(config: Config, market: MarketClient) -> Self {
        Self::with_stores(
            config,
            market,
            Arc::new(MemoryActivityStore::new()),
            Arc::new(MemoryFeedbackStore::new()),
        )
    }

    /// Creates state backed by PostgreSQL.
    #[must_use]
    pub fn with_database(config: Config, market: MarketClient, db: &DatabasePool) -> Self {
        Self::with_stores(
            config,
            market,
            Arc::new(PgActivityStore::new(db.pool().clone())),
            Arc::new(PgFeedbackStore::new(db.pool().clone())),
        )
    }

    /// Creates state from explicit stores.
    #[must_use]
    pub fn with_stores(
        config: Config,
        market: MarketClient,
        activity: Arc<dyn ActivityStore>,
        feedback: Arc<dyn FeedbackStore>,
    ) -> Self {
        let rate_limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
        Self {
            config,
            market,
            activity,
            feedback,
            cache: Arc::new(ResponseCache::default()),
            rate_limiter,
        }
    }

    /// Replaces the response cache, e.g. to shorten its TTL.
    #[must_use]
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Arc::new(cache);
        self
    }

    /// Key rotator used by the market client.
    #[must_use]
    pub fn rotator(&self) -> &Arc<KeyRotator> {
        self.market.rotator()
    }

    /// Records an activity entry in the background.
    ///
    /// The write runs on its own task; a failure is logged and never reaches
    /// the caller.
    pub fn log_activity(&self, ip: &str, action: &'static str, parameters: Value) {
        let store = Arc::clone(&self.activity);
        let entry = NewActivity::now(ip, action, parameters);

        tokio::spawn(async move {
            let ip = entry.ip_address.clone();
            match store.record(entry).await {
                Ok(()) => debug!("Logged activity: {} from {}", action, ip),
                Err(e) => warn!("Failed to log activity {}: {}", action, e),
            }
        });
    }
}
