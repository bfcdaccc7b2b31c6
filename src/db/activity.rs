//! Activity log storage.

use super::StoreError;
use super::schema::{
    ActionCount, ActivityFilter, ActivityLog, ActivityStats, DailyCount, IpCount, NewActivity,
    PageRequest, Paged,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use parking_lot::RwLock;
use sqlx::PgPool;
use std::collections::HashMap;

/// Number of IPs reported in [`ActivityStats::by_ip`].
const TOP_IP_COUNT: usize = 10;

/// Longest retention window honoured by [`retention_cutoff`], in days.
pub const MAX_RETENTION_DAYS: u32 = 36_500;

/// Start of a retention window of `days` days, capped at
/// [`MAX_RETENTION_DAYS`]. Entries logged before it are purged.
#[must_use]
pub fn retention_cutoff(days: u32) -> DateTime<Utc> {
    let days = days.min(MAX_RETENTION_DAYS);
    Utc::now()
        .checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Append-only activity log with filtered reads and age-based retention.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Appends an entry.
    async fn record(&self, entry: NewActivity) -> Result<(), StoreError>;

    /// Lists entries matching `filter`, newest first.
    async fn list(
        &self,
        filter: &ActivityFilter,
        page: PageRequest,
    ) -> Result<Paged<ActivityLog>, StoreError>;

    /// Aggregates entries with `start <= timestamp <= end`.
    async fn stats(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ActivityStats, StoreError>;

    /// Deletes entries older than `days` days and returns how many went.
    async fn purge_older_than(&self, days: u32) -> Result<u64, StoreError>;
}

// ============================================================================
// PostgreSQL
// ============================================================================

/// PostgreSQL-backed activity store.
#[derive(Clone)]
pub struct PgActivityStore {
    pool: PgPool,
}

impl PgActivityStore {
    /// Creates a store over `pool`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityStore for PgActivityStore {
    async fn record(&self, entry: NewActivity) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO activity_logs (ip_address, action, parameters, logged_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&entry.ip_address)
        .bind(&entry.action)
        .bind(entry.parameters.to_string())
        .bind(entry.logged_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(
        &self,
        filter: &ActivityFilter,
        page: PageRequest,
    ) -> Result<Paged<ActivityLog>, StoreError> {
        let items: Vec<ActivityLog> = sqlx::query_as(
            r#"
            SELECT id, ip_address, action, parameters, logged_at
            FROM activity_logs
            WHERE ($1::TEXT IS NULL OR action = $1)
              AND ($2::TEXT IS NULL OR ip_address = $2)
              AND ($3::TIMESTAMPTZ IS NULL OR logged_at >= $3)
              AND ($4::TIMESTAMPTZ IS NULL OR logged_at <= $4)
            ORDER BY logged_at DESC, id DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(&filter.action)
        .bind(&filter.ip_address)
        .bind(filter.start)
        .bind(filter.end)
        .bind(i64::from(page.limit))
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM activity_logs
            WHERE ($1::TEXT IS NULL OR action = $1)
              AND ($2::TEXT IS NULL OR ip_address = $2)
              AND ($3::TIMESTAMPTZ IS NULL OR logged_at >= $3)
              AND ($4::TIMESTAMPTZ IS NULL OR logged_at <= $4)
            "#,
        )
        .bind(&filter.action)
        .bind(&filter.ip_address)
        .bind(filter.start)
        .bind(filter.end)
        .fetch_one(&self.pool)
        .await?;

        Ok(Paged { items, total })
    }

    async fn stats(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ActivityStats, StoreError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM activity_logs WHERE logged_at BETWEEN $1 AND $2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        let by_action: Vec<ActionCount> = sqlx::query_as(
            r#"
            SELECT action, COUNT(*) AS count
            FROM activity_logs
            WHERE logged_at BETWEEN $1 AND $2
            GROUP BY action
            ORDER BY count DESC, action
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let by_day: Vec<DailyCount> = sqlx::query_as(
            r#"
            SELECT (logged_at AT TIME ZONE 'UTC')::DATE AS date, COUNT(*) AS count
            FROM activity_logs
            WHERE logged_at BETWEEN $1 AND $2
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let by_ip: Vec<IpCount> = sqlx::query_as(
            r#"
            SELECT ip_address, COUNT(*) AS count
            FROM activity_logs
            WHERE logged_at BETWEEN $1 AND $2
            GROUP BY ip_address
            ORDER BY count DESC, ip_address
            LIMIT $3
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(TOP_IP_COUNT as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(ActivityStats {
            total,
            by_action,
            by_day,
            by_ip,
        })
    }

    async fn purge_older_than(&self, days: u32) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM activity_logs WHERE logged_at < $1")
            .bind(retention_cutoff(days))
            .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// In-memory activity store.
#[derive(Debug, Default)]
pub struct MemoryActivityStore {
    inner: RwLock<MemoryLog>,
}

#[derive(Debug, Default)]
struct MemoryLog {
    next_id: i64,
    entries: Vec<ActivityLog>,
}

impl MemoryActivityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of all entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<ActivityLog> {
        self.inner.read().entries.clone()
    }
}

fn count_by<K, F>(entries: &[&ActivityLog], key: F) -> Vec<(K, i64)>
where
    K: std::hash::Hash + Eq + Ord + Clone,
    F: Fn(&ActivityLog) -> K,
{
    let mut counts: HashMap<K, i64> = HashMap::new();
    for entry in entries {
        *counts.entry(key(entry)).or_default() += 1;
    }
    counts.into_iter().collect()
}

#[async_trait]
impl ActivityStore for MemoryActivityStore {
    async fn record(&self, entry: NewActivity) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.entries.push(ActivityLog {
            id,
            ip_address: entry.ip_address,
            action: entry.action,
            parameters: entry.parameters.to_string(),
            logged_at: entry.logged_at,
        });
        Ok(())
    }

    async fn list(
        &self,
        filter: &ActivityFilter,
        page: PageRequest,
    ) -> Result<Paged<ActivityLog>, StoreError> {
        let inner = self.inner.read();
        let mut matching: Vec<&ActivityLog> =
            inner.entries.iter().filter(|e| filter.matches(e)).collect();
        matching.sort_by(|a, b| b.logged_at.cmp(&a.logged_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit as usize)
            .cloned()
            .collect();

        Ok(Paged { items, total })
    }

    async fn stats(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ActivityStats, StoreError> {
        let inner = self.inner.read();
        let in_range: Vec<&ActivityLog> = inner
            .entries
            .iter()
            .filter(|e| e.logged_at >= start && e.logged_at <= end)
            .collect();

        let mut by_action: Vec<ActionCount> = count_by(&in_range, |e| e.action.clone())
            .into_iter()
            .map(|(action, count)| ActionCount { action, count })
            .collect();
        by_action.sort_by(|a, b| b.count.cmp(&a.count).then(a.action.cmp(&b.action)));

        let mut by_day: Vec<DailyCount> =
            count_by(&in_range, |e| -> NaiveDate { e.logged_at.date_naive() })
                .into_iter()
                .map(|(date, count)| DailyCount { date, count })
                .collect();
        by_day.sort_by_key(|d| d.date);

        let mut by_ip: Vec<IpCount> = count_by(&in_range, |e| e.ip_address.clone())
            .into_iter()
            .map(|(ip_address, count)| IpCount { ip_address, count })
            .collect();
        by_ip.sort_by(|a, b| b.count.cmp(&a.count).then(a.ip_address.cmp(&b.ip_address)));
        by_ip.truncate(TOP_IP_COUNT);

        Ok(ActivityStats {
            total: in_range.len() as i64,
            by_action,
            by_day,
            by_ip,
        })
    }

    async fn purge_older_than(&self, days: u32) -> Result<u64, StoreError> {
        let cutoff = retention_cutoff(days);
        let mut inner = self.inner.write();
        let before = inner.entries.len();
        inner.entries.retain(|e| e.logged_at >= cutoff);
        Ok((before - inner.entries.len()) as u64)
    }
}
