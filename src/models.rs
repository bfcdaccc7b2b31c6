//! Request and response models for the REST API.

use crate::db::{ActivityLog, ActivityStats, Feedback};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

// ============================================================================
// Common
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Success envelope carrying only a message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    /// Always `true`.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
}

impl MessageResponse {
    /// A successful outcome with `message`.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Success envelope with a payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DataResponse<T> {
    /// Always `true`.
    pub success: bool,
    /// Optional outcome message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Payload.
    pub data: T,
}

impl<T> DataResponse<T> {
    /// A successful response carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    /// Adds an outcome message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Pagination block of list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
    /// Matching rows across all pages.
    pub total: i64,
    /// Number of pages.
    pub total_pages: i64,
}

// ============================================================================
// Market Data
// ============================================================================

/// Market-data response: payload plus upstream status metadata.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarketDataResponse {
    /// Always `true`.
    pub success: bool,
    /// Payload, shaped per endpoint.
    pub data: Value,
    /// Upstream `status` block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Whether the payload came from the response cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

impl MarketDataResponse {
    /// Fresh upstream payload.
    pub fn new(data: Value, metadata: Value) -> Self {
        Self {
            success: true,
            data,
            metadata: Some(metadata),
            cached: None,
        }
    }
}

/// Query for latest listings.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListingsQuery {
    /// 1-based offset (default 1).
    pub start: Option<u32>,
    /// Number of results (default 100).
    pub limit: Option<u32>,
    /// Sort field (default `market_cap`).
    pub sort: Option<String>,
    /// `asc` or `desc` (default `desc`).
    pub sort_dir: Option<String>,
    /// Quote currency (default `INR`).
    pub convert: Option<String>,
}

/// Query carrying only a quote currency.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConvertQuery {
    /// Quote currency (default `INR`).
    pub convert: Option<String>,
}

/// Query for search.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Symbol or name fragment.
    pub query: Option<String>,
    /// Maximum results (default 10).
    pub limit: Option<u32>,
    /// Quote currency (default `INR`).
    pub convert: Option<String>,
}

/// Query for historical quotes.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoricalQuery {
    /// Quote currency (default `INR`).
    pub convert: Option<String>,
    /// Sampling interval (default `daily`).
    pub interval: Option<String>,
    /// Range start.
    pub time_start: Option<String>,
    /// Range end.
    pub time_end: Option<String>,
    /// Number of points (default 10).
    pub count: Option<u32>,
}

/// Query for top movers.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TopMoversQuery {
    /// Entries per side (default 10).
    pub limit: Option<u32>,
    /// Quote currency (default `INR`).
    pub convert: Option<String>,
    /// `1h`, `24h`, `7d` or `30d` (default `24h`).
    pub timeframe: Option<String>,
}

/// Gainers and losers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TopMovers {
    /// Largest change first.
    pub gainers: Vec<Value>,
    /// Smallest change first.
    pub losers: Vec<Value>,
}

/// Projection of a listing entry served by the top-fifty endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TopCoin {
    /// Coin id.
    pub id: Value,
    /// Display name.
    pub name: Value,
    /// Ticker symbol.
    pub symbol: Value,
    /// Price in USD.
    pub price_usd: Value,
    /// Price in INR.
    pub price_inr: Value,
    /// Market cap in USD.
    pub market_cap: Value,
    /// 24h change in percent (USD).
    pub percent_change_24h: Value,
    /// 24h volume in USD.
    pub volume_24h: Value,
    /// Circulating supply.
    pub circulating_supply: Value,
    /// Total supply.
    pub total_supply: Value,
    /// Maximum supply.
    pub max_supply: Value,
    /// Last update time.
    pub last_updated: Value,
}

// ============================================================================
// Activity
// ============================================================================

/// Query for activity logs.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityLogsQuery {
    /// Page number (default 1).
    pub page: Option<u32>,
    /// Page size (default 50).
    pub limit: Option<u32>,
    /// Exact action name.
    pub action: Option<String>,
    /// Exact client IP.
    pub ip: Option<String>,
    /// Lower bound, RFC 3339 or `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Upper bound, RFC 3339 or `YYYY-MM-DD`.
    pub end_date: Option<String>,
}

/// Activity log page.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActivityLogsResponse {
    /// Always `true`.
    pub success: bool,
    /// Entries, newest first.
    pub data: Vec<ActivityLog>,
    /// Page information.
    pub pagination: Pagination,
}

/// Query for activity statistics.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityStatsQuery {
    /// Lower bound (default 30 days ago).
    pub start_date: Option<String>,
    /// Upper bound (default now).
    pub end_date: Option<String>,
}

/// Time range covered by statistics.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsTimeframe {
    /// Lower bound.
    pub start_date: String,
    /// Upper bound.
    pub end_date: String,
}

/// Activity statistics.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActivityStatsResponse {
    /// Always `true`.
    pub success: bool,
    /// Aggregates.
    pub data: ActivityStats,
    /// Range used.
    pub timeframe: StatsTimeframe,
}

/// Query for the retention sweep.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClearLogsQuery {
    /// Delete entries older than this many days (default 90).
    pub days: Option<i64>,
}

/// Result of the retention sweep.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClearLogsResult {
    /// Entries removed.
    pub deleted_count: u64,
}

// ============================================================================
// Feedback
// ============================================================================

/// Feedback submission.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct FeedbackSubmission {
    /// Submitter name.
    pub name: Option<String>,
    /// Submitter email.
    pub email: Option<String>,
    /// Subject line.
    pub subject: Option<String>,
    /// Message body.
    pub message: Option<String>,
}

/// Id of a newly created record.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreatedId {
    /// New id.
    pub id: i64,
}

/// Query for listing feedback.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeedbackListQuery {
    /// Page number (default 1).
    pub page: Option<u32>,
    /// Page size (default 10).
    pub limit: Option<u32>,
    /// Status filter; unknown values are ignored.
    pub status: Option<String>,
}

/// Feedback page.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FeedbackPage {
    /// Records, newest first.
    pub feedback: Vec<Feedback>,
    /// Page information.
    pub pagination: Pagination,
}

/// Status change request.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct StatusUpdateRequest {
    /// One of `new`, `read`, `responded`, `closed`.
    pub status: Option<String>,
}

// ============================================================================
// API Keys
// ============================================================================

/// Request to add an upstream API key.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddKeyRequest {
    /// Secret value.
    pub key: Option<String>,
    /// Advisory request ceiling (default 30).
    pub rate_limit: Option<u32>,
}

/// Request to remove an upstream API key.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RemoveKeyRequest {
    /// Secret value.
    pub key: Option<String>,
}

/// Masked upstream API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KeyInfo {
    /// Key with the middle elided.
    pub key: String,
    /// Advisory request ceiling.
    pub rate_limit: u32,
    /// Selections since the last reset.
    pub used: u64,
}

impl From<market_client::MaskedCredential> for KeyInfo {
    fn from(masked: market_client::MaskedCredential) -> Self {
        Self {
            key: masked.key,
            rate_limit: masked.rate_limit,
            used: masked.used,
        }
    }
}
