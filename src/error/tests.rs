//! Unit tests for error module.

use super::*;
use axum::Router;
use axum::routing::get;
use http_body_util::BodyExt;
use tower::ServiceExt;

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// ErrorResponse Tests
// ============================================================================

#[test]
fn test_error_response_omits_missing_detail() {
    let response = ErrorResponse {
        success: false,
        message: "Something went wrong".to_string(),
        error: None,
    };

    let json = serde_json::to_string(&response).unwrap();
    assert_eq!(json, r#"{"success":false,"message":"Something went wrong"}"#);
}

// ============================================================================
// ApiError Status Tests
// ============================================================================

#[test]
fn test_status_codes() {
    assert_eq!(
        ApiError::InvalidRequest("x".into()).status_code(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        ApiError::NotFound("x".into()).status_code(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        ApiError::upstream("Failed", market_client::Error::NoCredentials).status_code(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        ApiError::database("Failed", StoreError::Corrupt("bad".into())).status_code(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        ApiError::internal("Failed", "boom").status_code(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        ApiError::RateLimitExceeded {
            limit: 1,
            reset: 0,
            retry_after: 1
        }
        .status_code(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[test]
fn test_upstream_detail_hidden_from_message() {
    let error = ApiError::upstream(
        "Failed to fetch cryptocurrency listings",
        market_client::Error::Upstream {
            status: 401,
            body: "invalid key".to_string(),
        },
    );

    assert_eq!(error.message(), "Failed to fetch cryptocurrency listings");
    assert!(error.detail().unwrap().contains("401"));
}

#[test]
fn test_client_errors_have_no_detail() {
    assert!(ApiError::InvalidRequest("Search query is required".into())
        .detail()
        .is_none());
    assert!(ApiError::NotFound("Feedback not found".into())
        .detail()
        .is_none());
}

// ============================================================================
// IntoResponse Tests
// ============================================================================

#[tokio::test]
async fn test_into_response_envelope() {
    let response = ApiError::InvalidRequest("Search query is required".into()).into_response();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Search query is required");
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn test_internal_error_body_withholds_detail() {
    let response = ApiError::internal("Failed to fetch data", "connection reset").into_response();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.extensions().get::<DetailedError>().is_some());
    let json = body_json(response).await;
    assert_eq!(json["message"], "Failed to fetch data");
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn test_rate_limit_headers() {
    let response = ApiError::RateLimitExceeded {
        limit: 100,
        reset: 1_704_067_260,
        retry_after: 60,
    }
    .into_response();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let headers = response.headers();
    assert_eq!(headers["X-RateLimit-Limit"], "100");
    assert_eq!(headers["X-RateLimit-Remaining"], "0");
    assert_eq!(headers["X-RateLimit-Reset"], "1704067260");
    assert_eq!(headers["Retry-After"], "60");
}

// ============================================================================
// expose_error_details Tests
// ============================================================================

async fn failing() -> Result<&'static str, ApiError> {
    Err(ApiError::internal("Failed to fetch data", "connection reset"))
}

async fn rejected() -> Result<&'static str, ApiError> {
    Err(ApiError::InvalidRequest("Invalid status".into()))
}

#[tokio::test]
async fn test_expose_error_details_swaps_body() {
    let app = Router::new()
        .route("/fail", get(failing))
        .layer(axum::middleware::from_fn(expose_error_details));

    let response = app
        .oneshot(axum::http::Request::builder().uri("/fail").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Failed to fetch data");
    assert_eq!(json["error"], "connection reset");
}

#[tokio::test]
async fn test_expose_error_details_leaves_plain_errors() {
    let app = Router::new()
        .route("/reject", get(rejected))
        .layer(axum::middleware::from_fn(expose_error_details));

    let response = app
        .oneshot(
            axum::http::Request::builder()
                .uri("/reject")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Invalid status");
    assert!(json.get("error").is_none());
}
