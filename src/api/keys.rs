//! Upstream API key management handlers.

use crate::api::extract::ApiJson;
use crate::error::ApiError;
use crate::models::{AddKeyRequest, DataResponse, KeyInfo, MessageResponse, RemoveKeyRequest};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use market_client::{DEFAULT_RATE_LIMIT, KeyError, KeyRotator};
use std::sync::Arc;

fn key_error(message: &str, error: KeyError) -> ApiError {
    match error {
        KeyError::Io(_) | KeyError::Serialize(_) | KeyError::Task(_) => {
            ApiError::internal(message, error)
        }
        _ => ApiError::InvalidRequest(message.to_string()),
    }
}

fn required_key(key: Option<String>) -> Result<String, ApiError> {
    key.map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("API key is required".to_string()))
}

/// Adds an upstream API key.
#[utoipa::path(
    post,
    path = "/api/keys/add",
    request_body = AddKeyRequest,
    responses(
        (status = 200, description = "Key added", body = MessageResponse),
        (status = 400, description = "Missing or duplicate key", body = crate::error::ErrorResponse)
    ),
    tag = "Keys"
)]
pub async fn add_api_key(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<AddKeyRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let key = required_key(request.key)?;
    let rate_limit = request.rate_limit.unwrap_or(DEFAULT_RATE_LIMIT);

    state
        .rotator()
        .spawn_blocking(move |rotator| rotator.add_key(&key, rate_limit))
        .await
        .map_err(|e| key_error("Failed to add API key, it may already exist", e))?;

    Ok(Json(MessageResponse::ok("API key added successfully")))
}

/// Removes an upstream API key.
#[utoipa::path(
    post,
    path = "/api/keys/remove",
    request_body = RemoveKeyRequest,
    responses(
        (status = 200, description = "Key removed", body = MessageResponse),
        (status = 400, description = "Missing or unknown key", body = crate::error::ErrorResponse)
    ),
    tag = "Keys"
)]
pub async fn remove_api_key(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<RemoveKeyRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let key = required_key(request.key)?;

    state
        .rotator()
        .spawn_blocking(move |rotator| rotator.remove_key(&key))
        .await
        .map_err(|e| key_error("Failed to remove API key, it may not exist", e))?;

    Ok(Json(MessageResponse::ok("API key removed successfully")))
}

/// Lists upstream API keys with their secrets masked.
#[utoipa::path(
    get,
    path = "/api/keys/list",
    responses(
        (status = 200, description = "Masked keys"),
        (status = 500, description = "Key store failure", body = crate::error::ErrorResponse)
    ),
    tag = "Keys"
)]
pub async fn list_api_keys(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DataResponse<Vec<KeyInfo>>>, ApiError> {
    let keys = state
        .rotator()
        .spawn_blocking(|rotator| Ok(rotator.list_keys()))
        .await
        .map_err(|e| ApiError::internal("Failed to list API keys", e))?
        .into_iter()
        .map(KeyInfo::from)
        .collect();
    Ok(Json(DataResponse::ok(keys)))
}

/// Zeroes every key's usage counter.
#[utoipa::path(
    post,
    path = "/api/keys/reset-usage",
    responses(
        (status = 200, description = "Usage reset", body = MessageResponse),
        (status = 500, description = "Key file could not be written", body = crate::error::ErrorResponse)
    ),
    tag = "Keys"
)]
pub async fn reset_api_key_usage(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .rotator()
        .spawn_blocking(KeyRotator::reset_usage)
        .await
        .map_err(|e| ApiError::internal("Failed to reset API key usage counts", e))?;

    Ok(Json(MessageResponse::ok(
        "API key usage counts reset successfully",
    )))
}
