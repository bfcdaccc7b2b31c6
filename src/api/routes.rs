//! Route configuration.

use crate::api::middleware::rate_limit_middleware;
use crate::api::{activity, feedback, handlers, keys};
use crate::error::{ApiError, expose_error_details};
use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{delete, get, patch, post};
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

/// Routes under `/api`, rate limited per client IP.
fn api_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        // Market data
        .route("/crypto/listings/latest", get(handlers::get_latest_listings))
        .route("/crypto/info/{id}", get(handlers::get_crypto_details))
        .route("/crypto/search", get(handlers::search_cryptocurrencies))
        .route("/crypto/historical/{id}", get(handlers::get_historical_data))
        .route("/crypto/top-movers", get(handlers::get_top_movers))
        .route("/crypto/top-fifty", get(handlers::get_top_fifty))
        // Activity
        .route("/activity/logs", get(activity::get_activity_logs))
        .route("/activity/stats", get(activity::get_activity_stats))
        .route("/activity/logs/clear", delete(activity::clear_old_logs))
        // Feedback
        .route("/feedback", get(feedback::list_feedback))
        .route("/feedback/submit", post(feedback::submit_feedback))
        .route(
            "/feedback/{id}/status",
            patch(feedback::update_feedback_status),
        )
        .route("/feedback/{id}", delete(feedback::delete_feedback))
        // API keys
        .route("/keys/add", post(keys::add_api_key))
        .route("/keys/remove", post(keys::remove_api_key))
        .route("/keys/list", get(keys::list_api_keys))
        .route("/keys/reset-usage", post(keys::reset_api_key_usage))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            Arc::clone(state),
            rate_limit_middleware,
        ))
}

/// Creates the API router.
///
/// Unmatched paths outside `/api` are served from the static directory when
/// one is configured. Error details are exposed in development mode only.
pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .nest("/api", api_routes(&state));

    router = match &state.config.server.static_dir {
        Some(dir) => router.fallback_service(
            ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))),
        ),
        None => router.fallback(not_found),
    };

    if state.config.environment.exposes_error_details() {
        router = router.layer(middleware::from_fn(expose_error_details));
    }

    router.with_state(state)
}
