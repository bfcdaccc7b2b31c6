//! Error types for the REST API.
//!
//! [`ApiError`] is the only place where failure categories become HTTP
//! statuses. Error bodies never carry internal detail by themselves; the
//! detailed body is parked in the response extensions and swapped in by
//! [`expose_error_details`], which the router installs in development mode only.

use crate::db::StoreError;
use axum::Json;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

#[cfg(test)]
mod tests;

/// Uniform error envelope.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Human-readable message.
    pub message: String,
    /// Internal detail, only in development mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Detailed error body withheld from the client unless exposed.
#[derive(Debug, Clone)]
pub struct DetailedError(pub ErrorResponse);

/// API error types.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or invalid parameter.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Market-data API call failed, including "no API keys".
    #[error("{message}: {source}")]
    Upstream {
        /// Client-facing message.
        message: String,
        /// Underlying client error.
        source: market_client::Error,
    },

    /// Database failure.
    #[error("{message}: {source}")]
    Database {
        /// Client-facing message.
        message: String,
        /// Underlying store error.
        source: StoreError,
    },

    /// Any other server-side failure.
    #[error("{message}: {detail}")]
    Internal {
        /// Client-facing message.
        message: String,
        /// Internal detail.
        detail: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimitExceeded {
        /// Maximum requests allowed.
        limit: u32,
        /// Unix timestamp when the rate limit resets.
        reset: u64,
        /// Seconds until reset.
        retry_after: u64,
    },
}

impl ApiError {
    /// Upstream failure with a client-facing message.
    pub fn upstream(message: impl Into<String>, source: market_client::Error) -> Self {
        Self::Upstream {
            message: message.into(),
            source,
        }
    }

    /// Database failure with a client-facing message.
    pub fn database(message: impl Into<String>, source: StoreError) -> Self {
        Self::Database {
            message: message.into(),
            source,
        }
    }

    /// Internal failure with a client-facing message.
    pub fn internal(message: impl Into<String>, detail: impl ToString) -> Self {
        Self::Internal {
            message: message.into(),
            detail: detail.to_string(),
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream { .. } | Self::Database { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Message safe to show to any client.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::InvalidRequest(message) | Self::NotFound(message) => message.clone(),
            Self::Upstream { message, .. }
            | Self::Database { message, .. }
            | Self::Internal { message, .. } => message.clone(),
            Self::RateLimitExceeded { .. } => {
                "Too many requests, please try again later.".to_string()
            }
        }
    }

    /// Internal detail, shown only in development mode.
    #[must_use]
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Upstream { source, .. } => Some(source.to_string()),
            Self::Database { source, .. } => Some(source.to_string()),
            Self::Internal { detail, .. } => Some(detail.clone()),
            _ => None,
        }
    }

    fn log(&self) {
        match self {
            Self::Upstream { message, source } => {
                error!(
                    status = ?source.status(),
                    body = source.body().unwrap_or_default(),
                    "{}: {}",
                    message,
                    source
                );
            }
            Self::Database { .. } | Self::Internal { .. } => error!("{}", self),
            Self::RateLimitExceeded { .. } => warn!("{}", self),
            Self::InvalidRequest(_) | Self::NotFound(_) => {}
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.status_code();
        let body = ErrorResponse {
            success: false,
            message: self.message(),
            error: None,
        };
        let detailed = self.detail().map(|detail| ErrorResponse {
            error: Some(detail),
            ..body.clone()
        });

        let mut response = match &self {
            ApiError::RateLimitExceeded {
                limit,
                reset,
                retry_after,
            } => (
                status,
                [
                    ("X-RateLimit-Limit", limit.to_string()),
                    ("X-RateLimit-Remaining", "0".to_string()),
                    ("X-RateLimit-Reset", reset.to_string()),
                    ("Retry-After", retry_after.to_string()),
                ],
                Json(body),
            )
                .into_response(),
            _ => (status, Json(body)).into_response(),
        };

        if let Some(detailed) = detailed {
            response.extensions_mut().insert(DetailedError(detailed));
        }

        response
    }
}

/// Middleware that replaces error bodies with their detailed variant.
pub async fn expose_error_details(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let Some(DetailedError(detailed)) = response.extensions().get::<DetailedError>().cloned()
    else {
        return response;
    };

    match serde_json::to_vec(&detailed) {
        Ok(bytes) => {
            let (mut parts, _) = response.into_parts();
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(e) => {
            warn!("Failed to serialize detailed error: {}", e);
            response
        }
    }
}
