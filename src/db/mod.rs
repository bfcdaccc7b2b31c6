//! Persistence for activity logs and user feedback.
//!
//! Handlers talk to [`ActivityStore`] and [`FeedbackStore`]; PostgreSQL backs
//! them in production and the in-memory variants serve tests and database-less
//! runs.

mod activity;
mod feedback;
mod pool;
mod schema;

pub use activity::{
    ActivityStore, MAX_RETENTION_DAYS, MemoryActivityStore, PgActivityStore, retention_cutoff,
};
pub use feedback::{FeedbackStore, MemoryFeedbackStore, PgFeedbackStore};
pub use pool::DatabasePool;
pub use schema::*;

/// Store error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Query or connection failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A stored value could not be interpreted.
    #[error("invalid stored value: {0}")]
    Corrupt(String),
}
