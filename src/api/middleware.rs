//! API middleware for rate limiting.

use crate::api::extract::{client_ip, peer_ip};
use crate::error::ApiError;
use crate::rate_limit::RateDecision;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Rate limiting middleware.
///
/// Counts requests per client IP over a sliding window and answers 429 once
/// the window is full. Adds rate limit headers to allowed responses.
///
/// Clients are keyed on the socket peer; forwarding headers are honoured only
/// with `rate_limit.trust_proxy`.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // Exempt health check endpoint
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let client = if state.config.rate_limit.trust_proxy {
        client_ip(request.headers(), request.extensions())
    } else {
        peer_ip(request.extensions())
    };
    let limit = state.rate_limiter.max_requests();

    match state.rate_limiter.check_and_record(&client) {
        RateDecision::Limited { reset, retry_after } => ApiError::RateLimitExceeded {
            limit,
            reset,
            retry_after,
        }
        .into_response(),
        RateDecision::Allowed { remaining, reset } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert("X-RateLimit-Limit", HeaderValue::from(limit));
            headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
            headers.insert("X-RateLimit-Reset", HeaderValue::from(reset));
            response
        }
    }
}
