//! Key rotation tests: which key each upstream call carries.

use axum::http::StatusCode;
use proxy_tests::TestApp;
use serde_json::json;
use std::collections::HashMap;

const FIRST: &str = "first-key-0123456789";
const SECOND: &str = "second-key-0123456789";

#[tokio::test]
async fn test_calls_spread_across_keys() {
    let app = TestApp::spawn(&[FIRST, SECOND]).await;

    for _ in 0..4 {
        let (status, _) = app.get("/api/crypto/listings/latest").await;
        assert_eq!(status, StatusCode::OK);
    }

    let mut per_key: HashMap<String, usize> = HashMap::new();
    for hit in app.upstream.hits() {
        *per_key.entry(hit.api_key.unwrap_or_default()).or_default() += 1;
    }
    assert_eq!(per_key.get(FIRST), Some(&2));
    assert_eq!(per_key.get(SECOND), Some(&2));

    let set = app.keys.snapshot();
    assert!(set.keys.iter().all(|k| k.used == 2));
}

#[tokio::test]
async fn test_consecutive_calls_alternate() {
    let app = TestApp::spawn(&[FIRST, SECOND]).await;

    app.get("/api/crypto/info/1").await;
    app.get("/api/crypto/info/1").await;

    let keys: Vec<String> = app
        .upstream
        .hits()
        .into_iter()
        .filter_map(|h| h.api_key)
        .collect();
    assert_eq!(keys.len(), 2);
    assert_ne!(keys[0], keys[1]);
}

#[tokio::test]
async fn test_search_fallback_uses_one_key_per_call() {
    let app = TestApp::spawn(&[FIRST]).await;

    app.get("/api/crypto/search?query=coin").await;

    // Symbol lookup, coin map, quotes by id.
    assert_eq!(app.upstream.hits().len(), 3);
    assert_eq!(app.keys.snapshot().keys[0].used, 3);
}

#[tokio::test]
async fn test_added_key_joins_rotation() {
    let app = TestApp::spawn(&[FIRST]).await;
    app.get("/api/crypto/listings/latest").await;

    let (status, _) = app
        .post("/api/keys/add", json!({ "key": SECOND, "rateLimit": 10 }))
        .await;
    assert_eq!(status, StatusCode::OK);

    app.get("/api/crypto/listings/latest").await;

    let last = app.upstream.hits().pop().and_then(|h| h.api_key);
    assert_eq!(last.as_deref(), Some(SECOND));
}

#[tokio::test]
async fn test_no_keys_never_reaches_upstream() {
    let app = TestApp::spawn(&[]).await;

    let (status, json) = app.get("/api/crypto/listings/latest").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "No API keys available");
    assert!(app.upstream.hits().is_empty());
}
