//! Database schema types and query inputs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::StoreError;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Activity log record.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct ActivityLog {
    /// Unique identifier.
    pub id: i64,
    /// Client IP address.
    pub ip_address: String,
    /// Handler that produced the entry, e.g. `getLatestListings`.
    pub action: String,
    /// Request parameters, serialized JSON.
    pub parameters: String,
    /// When the action happened.
    #[serde(rename = "timestamp")]
    pub logged_at: DateTime<Utc>,
}

/// Activity entry to append.
#[derive(Debug, Clone)]
pub struct NewActivity {
    /// Client IP address.
    pub ip_address: String,
    /// Action name.
    pub action: String,
    /// Request parameters.
    pub parameters: serde_json::Value,
    /// When the action happened.
    pub logged_at: DateTime<Utc>,
}

impl NewActivity {
    /// An entry stamped with the current time.
    pub fn now(
        ip_address: impl Into<String>,
        action: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            ip_address: ip_address.into(),
            action: action.into(),
            parameters,
            logged_at: Utc::now(),
        }
    }
}

/// Optional filters for activity queries. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityFilter {
    /// Exact action name.
    pub action: Option<String>,
    /// Exact client IP.
    pub ip_address: Option<String>,
    /// Inclusive lower bound.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    pub end: Option<DateTime<Utc>>,
}

impl ActivityFilter {
    /// Whether `log` passes every set filter.
    #[must_use]
    pub fn matches(&self, log: &ActivityLog) -> bool {
        self.action.as_ref().is_none_or(|a| *a == log.action)
            && self.ip_address.as_ref().is_none_or(|ip| *ip == log.ip_address)
            && self.start.is_none_or(|start| log.logged_at >= start)
            && self.end.is_none_or(|end| log.logged_at <= end)
    }
}

/// Page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
}

impl PageRequest {
    /// Builds a page request, clamping to `1..` and `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Rows to skip.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    /// Number of pages needed for `total` rows.
    #[must_use]
    pub fn total_pages(&self, total: i64) -> i64 {
        let limit = i64::from(self.limit);
        (total.max(0) + limit - 1) / limit
    }
}

/// One page of results plus the unpaged total.
#[derive(Debug, Clone, PartialEq)]
pub struct Paged<T> {
    /// Rows on this page.
    pub items: Vec<T>,
    /// Rows matching the query across all pages.
    pub total: i64,
}

/// Count of entries per action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct ActionCount {
    /// Action name.
    pub action: String,
    /// Entries.
    pub count: i64,
}

/// Count of entries per calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct DailyCount {
    /// Day.
    pub date: NaiveDate,
    /// Entries.
    pub count: i64,
}

/// Count of entries per client IP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct IpCount {
    /// Client IP.
    pub ip_address: String,
    /// Entries.
    pub count: i64,
}

/// Aggregates over a time range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStats {
    /// Entries in range.
    pub total: i64,
    /// Per action, most frequent first.
    pub by_action: Vec<ActionCount>,
    /// Per day, oldest first.
    pub by_day: Vec<DailyCount>,
    /// Ten most active IPs.
    pub by_ip: Vec<IpCount>,
}

/// Feedback lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    /// Just submitted.
    New,
    /// Seen by an admin.
    Read,
    /// Answered.
    Responded,
    /// Done.
    Closed,
}

impl FeedbackStatus {
    /// Every accepted status.
    pub const ALL: [FeedbackStatus; 4] = [Self::New, Self::Read, Self::Responded, Self::Closed];

    /// Database and wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Read => "read",
            Self::Responded => "responded",
            Self::Closed => "closed",
        }
    }

    /// Parses an exact lowercase status name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

impl std::fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored feedback.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Feedback {
    /// Unique identifier.
    pub id: i64,
    /// Submitter name.
    pub name: String,
    /// Submitter email.
    pub email: String,
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub message: String,
    /// Submitter IP.
    pub ip_address: String,
    /// Current status.
    pub status: FeedbackStatus,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

/// Feedback row as stored; `status` is plain text.
#[derive(Debug, FromRow)]
pub(crate) struct FeedbackRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub ip_address: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<FeedbackRow> for Feedback {
    type Error = StoreError;

    fn try_from(row: FeedbackRow) -> Result<Self, Self::Error> {
        let status = FeedbackStatus::parse(&row.status).ok_or_else(|| {
            StoreError::Corrupt(format!(
                "feedback {} has unknown status {}",
                row.id, row.status
            ))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            email: row.email,
            subject: row.subject,
            message: row.message,
            ip_address: row.ip_address,
            status,
            created_at: row.created_at,
        })
    }
}

/// Feedback to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeedback {
    /// Submitter name.
    pub name: String,
    /// Submitter email.
    pub email: String,
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub message: String,
    /// Submitter IP.
    pub ip_address: String,
}
