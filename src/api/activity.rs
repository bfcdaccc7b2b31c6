//! Activity log handlers.

use crate::api::extract::ApiQuery;
use crate::db::{ActivityFilter, MAX_RETENTION_DAYS, PageRequest};
use crate::error::ApiError;
use crate::models::{
    ActivityLogsQuery, ActivityLogsResponse, ActivityStatsQuery, ActivityStatsResponse,
    ClearLogsQuery, ClearLogsResult, DataResponse, Pagination, StatsTimeframe,
};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use tracing::info;

/// Which end of a day a date-only bound refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Start,
    End,
}

/// Parses an RFC 3339 timestamp or a `YYYY-MM-DD` date.
///
/// A bare date covers the whole day: as a start bound it is midnight UTC, as an
/// end bound the last millisecond of that day.
fn parse_date(name: &str, value: &str, bound: Bound) -> Result<DateTime<Utc>, ApiError> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ApiError::InvalidRequest(format!(
            "Invalid {}: {}. Use YYYY-MM-DD or an RFC 3339 timestamp",
            name, value
        ))
    })?;

    let time = match bound {
        Bound::Start => NaiveTime::MIN,
        Bound::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN),
    };
    Ok(date.and_time(time).and_utc())
}

fn parse_optional_date(
    name: &str,
    value: Option<&str>,
    bound: Bound,
) -> Result<Option<DateTime<Utc>>, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| parse_date(name, v, bound))
        .transpose()
}

// ============================================================================
// Logs
// ============================================================================

/// Lists activity entries, newest first.
#[utoipa::path(
    get,
    path = "/api/activity/logs",
    params(ActivityLogsQuery),
    responses(
        (status = 200, description = "Activity log page", body = ActivityLogsResponse),
        (status = 400, description = "Invalid date", body = crate::error::ErrorResponse),
        (status = 500, description = "Database failure", body = crate::error::ErrorResponse)
    ),
    tag = "Activity"
)]
pub async fn get_activity_logs(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ActivityLogsQuery>,
) -> Result<Json<ActivityLogsResponse>, ApiError> {
    let page = PageRequest::new(query.page.unwrap_or(1), query.limit.unwrap_or(50));
    let filter = ActivityFilter {
        action: query.action.filter(|a| !a.is_empty()),
        ip_address: query.ip.filter(|ip| !ip.is_empty()),
        start: parse_optional_date("start_date", query.start_date.as_deref(), Bound::Start)?,
        end: parse_optional_date("end_date", query.end_date.as_deref(), Bound::End)?,
    };

    let logs = state
        .activity
        .list(&filter, page)
        .await
        .map_err(|e| ApiError::database("Failed to fetch activity logs", e))?;

    Ok(Json(ActivityLogsResponse {
        success: true,
        pagination: Pagination {
            page: page.page,
            limit: page.limit,
            total: logs.total,
            total_pages: page.total_pages(logs.total),
        },
        data: logs.items,
    }))
}

// ============================================================================
// Stats
// ============================================================================

/// Aggregates activity over a range, by default the last 30 days.
#[utoipa::path(
    get,
    path = "/api/activity/stats",
    params(ActivityStatsQuery),
    responses(
        (status = 200, description = "Activity statistics", body = ActivityStatsResponse),
        (status = 400, description = "Invalid date", body = crate::error::ErrorResponse),
        (status = 500, description = "Database failure", body = crate::error::ErrorResponse)
    ),
    tag = "Activity"
)]
pub async fn get_activity_stats(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ActivityStatsQuery>,
) -> Result<Json<ActivityStatsResponse>, ApiError> {
    let now = Utc::now();
    let start = parse_optional_date("start_date", query.start_date.as_deref(), Bound::Start)?
        .unwrap_or(now - Duration::days(30));
    let end =
        parse_optional_date("end_date", query.end_date.as_deref(), Bound::End)?.unwrap_or(now);

    if start > end {
        return Err(ApiError::InvalidRequest(
            "start_date must not be after end_date".to_string(),
        ));
    }

    let stats = state
        .activity
        .stats(start, end)
        .await
        .map_err(|e| ApiError::database("Failed to fetch activity statistics", e))?;

    Ok(Json(ActivityStatsResponse {
        success: true,
        data: stats,
        timeframe: StatsTimeframe {
            start_date: start.to_rfc3339(),
            end_date: end.to_rfc3339(),
        },
    }))
}

// ============================================================================
// Retention
// ============================================================================

/// Deletes entries older than `days` days (default 90). Windows longer than
/// [`MAX_RETENTION_DAYS`] are shortened to it.
#[utoipa::path(
    delete,
    path = "/api/activity/logs/clear",
    params(ClearLogsQuery),
    responses(
        (status = 200, description = "Entries deleted"),
        (status = 400, description = "days below 1", body = crate::error::ErrorResponse),
        (status = 500, description = "Database failure", body = crate::error::ErrorResponse)
    ),
    tag = "Activity"
)]
pub async fn clear_old_logs(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ClearLogsQuery>,
) -> Result<Json<DataResponse<ClearLogsResult>>, ApiError> {
    let days = query.days.unwrap_or(90);
    if days < 1 {
        return Err(ApiError::InvalidRequest(
            "Days parameter must be at least 1".to_string(),
        ));
    }
    let days = u32::try_from(days)
        .unwrap_or(u32::MAX)
        .min(MAX_RETENTION_DAYS);

    let deleted_count = state
        .activity
        .purge_older_than(days)
        .await
        .map_err(|e| ApiError::database("Failed to clear old activity logs", e))?;

    info!(
        "Cleared {} old activity logs older than {} days",
        deleted_count, days
    );

    Ok(Json(
        DataResponse::ok(ClearLogsResult { deleted_count })
            .with_message(format!("Cleared {} old activity logs", deleted_count)),
    ))
}
