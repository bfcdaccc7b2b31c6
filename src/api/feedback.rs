//! User feedback handlers.

use crate::api::extract::{ApiJson, ApiPath, ApiQuery, ClientIp};
use crate::db::{FeedbackStatus, NewFeedback, PageRequest};
use crate::error::ApiError;
use crate::models::{
    CreatedId, DataResponse, FeedbackListQuery, FeedbackPage, FeedbackSubmission,
    MessageResponse, Pagination, StatusUpdateRequest,
};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use std::sync::Arc;
use tracing::info;

/// Strips HTML tags and escapes characters significant in HTML.
#[must_use]
pub fn sanitize_input(input: &str) -> String {
    let mut stripped = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find('<') {
        match rest[open..].find('>') {
            Some(close) => {
                stripped.push_str(&rest[..open]);
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    stripped.push_str(rest);

    let mut escaped = String::with_capacity(stripped.len());
    for c in stripped.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            '/' => escaped.push_str("&#x2F;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Whether `email` has the shape `local@domain.tld` with no whitespace.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// Submit
// ============================================================================

/// Stores a feedback submission with status `new`.
#[utoipa::path(
    post,
    path = "/api/feedback/submit",
    request_body = FeedbackSubmission,
    responses(
        (status = 201, description = "Feedback stored"),
        (status = 400, description = "Missing field or invalid email", body = crate::error::ErrorResponse),
        (status = 500, description = "Database failure", body = crate::error::ErrorResponse)
    ),
    tag = "Feedback"
)]
pub async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    ApiJson(submission): ApiJson<FeedbackSubmission>,
) -> Result<(StatusCode, Json<DataResponse<CreatedId>>), ApiError> {
    let (Some(name), Some(email), Some(subject), Some(message)) = (
        required(submission.name),
        required(submission.email),
        required(submission.subject),
        required(submission.message),
    ) else {
        return Err(ApiError::InvalidRequest(
            "All fields are required: name, email, subject, message".to_string(),
        ));
    };

    if !is_valid_email(email.trim()) {
        return Err(ApiError::InvalidRequest("Invalid email format".to_string()));
    }

    let feedback = NewFeedback {
        name: sanitize_input(&name),
        email: sanitize_input(email.trim()),
        subject: sanitize_input(&subject),
        message: sanitize_input(&message),
        ip_address: ip,
    };
    info!(
        "New feedback submitted by {} ({})",
        feedback.name, feedback.email
    );

    let id = state
        .feedback
        .create(feedback)
        .await
        .map_err(|e| ApiError::database("An error occurred while submitting feedback", e))?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::ok(CreatedId { id }).with_message("Feedback submitted successfully")),
    ))
}

// ============================================================================
// List
// ============================================================================

/// Lists feedback newest first, optionally filtered by status.
#[utoipa::path(
    get,
    path = "/api/feedback",
    params(FeedbackListQuery),
    responses(
        (status = 200, description = "Feedback page"),
        (status = 500, description = "Database failure", body = crate::error::ErrorResponse)
    ),
    tag = "Feedback"
)]
pub async fn list_feedback(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<FeedbackListQuery>,
) -> Result<Json<DataResponse<FeedbackPage>>, ApiError> {
    let page = PageRequest::new(query.page.unwrap_or(1), query.limit.unwrap_or(10));
    let status = query.status.as_deref().and_then(FeedbackStatus::parse);

    let result = state
        .feedback
        .list(status, page)
        .await
        .map_err(|e| ApiError::database("An error occurred while retrieving feedback", e))?;

    Ok(Json(DataResponse::ok(FeedbackPage {
        pagination: Pagination {
            page: page.page,
            limit: page.limit,
            total: result.total,
            total_pages: page.total_pages(result.total),
        },
        feedback: result.items,
    })))
}

// ============================================================================
// Update / Delete
// ============================================================================

/// Sets the status of one feedback record.
#[utoipa::path(
    patch,
    path = "/api/feedback/{id}/status",
    params(("id" = i64, Path, description = "Feedback id")),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Status updated", body = MessageResponse),
        (status = 400, description = "Invalid status", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown id", body = crate::error::ErrorResponse),
        (status = 500, description = "Database failure", body = crate::error::ErrorResponse)
    ),
    tag = "Feedback"
)]
pub async fn update_feedback_status(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<StatusUpdateRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let status = request
        .status
        .as_deref()
        .and_then(FeedbackStatus::parse)
        .ok_or_else(|| {
            ApiError::InvalidRequest(
                "Invalid status. Must be one of: new, read, responded, closed".to_string(),
            )
        })?;

    let updated = state
        .feedback
        .update_status(id, status)
        .await
        .map_err(|e| {
            ApiError::database("An error occurred while updating feedback status", e)
        })?;

    if !updated {
        return Err(ApiError::NotFound("Feedback not found".to_string()));
    }

    info!("Feedback ID {} status updated to {}", id, status);
    Ok(Json(MessageResponse::ok("Feedback status updated successfully")))
}

/// Deletes one feedback record.
#[utoipa::path(
    delete,
    path = "/api/feedback/{id}",
    params(("id" = i64, Path, description = "Feedback id")),
    responses(
        (status = 200, description = "Feedback deleted", body = MessageResponse),
        (status = 404, description = "Unknown id", body = crate::error::ErrorResponse),
        (status = 500, description = "Database failure", body = crate::error::ErrorResponse)
    ),
    tag = "Feedback"
)]
pub async fn delete_feedback(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = state
        .feedback
        .delete(id)
        .await
        .map_err(|e| ApiError::database("An error occurred while deleting feedback", e))?;

    if !deleted {
        return Err(ApiError::NotFound("Feedback not found".to_string()));
    }

    info!("Feedback ID {} deleted", id);
    Ok(Json(MessageResponse::ok("Feedback deleted successfully")))
}
