//! User feedback storage.

use super::StoreError;
use super::schema::{Feedback, FeedbackRow, FeedbackStatus, NewFeedback, PageRequest, Paged};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use sqlx::PgPool;

/// Feedback records with a status lifecycle.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Stores a new submission with status `new` and returns its id.
    async fn create(&self, feedback: NewFeedback) -> Result<i64, StoreError>;

    /// Lists submissions newest first, optionally by status.
    async fn list(
        &self,
        status: Option<FeedbackStatus>,
        page: PageRequest,
    ) -> Result<Paged<Feedback>, StoreError>;

    /// Sets the status of `id`. Returns `false` if no such record exists.
    async fn update_status(&self, id: i64, status: FeedbackStatus) -> Result<bool, StoreError>;

    /// Deletes `id`. Returns `false` if no such record exists.
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
}

// ============================================================================
// PostgreSQL
// ============================================================================

/// PostgreSQL-backed feedback store.
#[derive(Clone)]
pub struct PgFeedbackStore {
    pool: PgPool,
}

impl PgFeedbackStore {
    /// Creates a store over `pool`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedbackStore for PgFeedbackStore {
    async fn create(&self, feedback: NewFeedback) -> Result<i64, StoreError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO user_feedback (name, email, subject, message, ip_address, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&feedback.name)
        .bind(&feedback.email)
        .bind(&feedback.subject)
        .bind(&feedback.message)
        .bind(&feedback.ip_address)
        .bind(FeedbackStatus::New.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn list(
        &self,
        status: Option<FeedbackStatus>,
        page: PageRequest,
    ) -> Result<Paged<Feedback>, StoreError> {
        let status = status.map(FeedbackStatus::as_str);

        let rows: Vec<FeedbackRow> = sqlx::query_as(
            r#"
            SELECT id, name, email, subject, message, ip_address, status, created_at
            FROM user_feedback
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(i64::from(page.limit))
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_feedback WHERE ($1::TEXT IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Feedback::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paged { items, total })
    }

    async fn update_status(&self, id: i64, status: FeedbackStatus) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE user_feedback SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM user_feedback WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// In-memory feedback store.
#[derive(Debug, Default)]
pub struct MemoryFeedbackStore {
    inner: RwLock<MemoryFeedback>,
}

#[derive(Debug, Default)]
struct MemoryFeedback {
    next_id: i64,
    records: Vec<Feedback>,
}

impl MemoryFeedbackStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a record by id.
    #[must_use]
    pub fn get(&self, id: i64) -> Option<Feedback> {
        self.inner.read().records.iter().find(|f| f.id == id).cloned()
    }
}

#[async_trait]
impl FeedbackStore for MemoryFeedbackStore {
    async fn create(&self, feedback: NewFeedback) -> Result<i64, StoreError> {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.records.push(Feedback {
            id,
            name: feedback.name,
            email: feedback.email,
            subject: feedback.subject,
            message: feedback.message,
            ip_address: feedback.ip_address,
            status: FeedbackStatus::New,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list(
        &self,
        status: Option<FeedbackStatus>,
        page: PageRequest,
    ) -> Result<Paged<Feedback>, StoreError> {
        let inner = self.inner.read();
        let mut matching: Vec<&Feedback> = inner
            .records
            .iter()
            .filter(|f| status.is_none_or(|s| f.status == s))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit as usize)
            .cloned()
            .collect();

        Ok(Paged { items, total })
    }

    async fn update_status(&self, id: i64, status: FeedbackStatus) -> Result<bool, StoreError> {
        let mut inner = self.inner.write();
        match inner.records.iter_mut().find(|f| f.id == id) {
            Some(record) => {
                record.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut inner = self.inner.write();
        let before = inner.records.len();
        inner.records.retain(|f| f.id != id);
        Ok(inner.records.len() < before)
    }
}
