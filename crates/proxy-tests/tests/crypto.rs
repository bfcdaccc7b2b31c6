//! Market-data endpoint tests against the mock upstream.

use axum::http::StatusCode;
use crypto_market_proxy::config::{Config, Environment};
use proxy_tests::TestApp;
use serde_json::Value;
use std::time::Duration;

fn symbols(data: &Value) -> Vec<String> {
    let mut symbols: Vec<String> = data
        .as_array()
        .expect("data should be an array")
        .iter()
        .map(|c| c["symbol"].as_str().unwrap_or_default().to_string())
        .collect();
    symbols.sort();
    symbols
}

// ============================================================================
// Listings
// ============================================================================

#[tokio::test]
async fn test_listings_forward_defaults() {
    let app = TestApp::spawn(&["key-one-0123456789"]).await;

    let (status, json) = app.get("/api/crypto/listings/latest?sort=bogus").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"].as_array().map(Vec::len), Some(4));
    assert_eq!(json["metadata"]["credit_count"], 1);

    let hits = app.upstream.hits_for("/cryptocurrency/listings/latest");
    assert_eq!(hits.len(), 1);
    let query = &hits[0].query;
    assert_eq!(query["start"], "1");
    assert_eq!(query["limit"], "100");
    assert_eq!(query["sort"], "market_cap");
    assert_eq!(query["sort_dir"], "desc");
    assert_eq!(query["convert"], "INR");
}

#[tokio::test]
async fn test_listings_forward_caller_values() {
    let app = TestApp::spawn(&["key-one-0123456789"]).await;

    let (status, _) = app
        .get("/api/crypto/listings/latest?start=11&limit=5&sort=price&sort_dir=asc&convert=USD")
        .await;

    assert_eq!(status, StatusCode::OK);
    let query = &app.upstream.hits_for("/cryptocurrency/listings/latest")[0].query;
    assert_eq!(query["start"], "11");
    assert_eq!(query["limit"], "5");
    assert_eq!(query["sort"], "price");
    assert_eq!(query["sort_dir"], "asc");
    assert_eq!(query["convert"], "USD");
}

// ============================================================================
// Details
// ============================================================================

#[tokio::test]
async fn test_details_by_id() {
    let app = TestApp::spawn(&["key-one-0123456789"]).await;

    let (status, json) = app.get("/api/crypto/info/1027?convert=USD").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["symbol"], "ETH");
    let query = &app.upstream.hits_for("/cryptocurrency/quotes/latest")[0].query;
    assert_eq!(query["id"], "1027");
    assert_eq!(query["convert"], "USD");
}

#[tokio::test]
async fn test_details_unknown_id_fails_upstream() {
    let app = TestApp::spawn(&["key-one-0123456789"]).await;

    let (status, json) = app.get("/api/crypto/info/999999").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["message"], "Failed to fetch cryptocurrency details");
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn test_search_exact_symbol() {
    let app = TestApp::spawn(&["key-one-0123456789"]).await;

    let (status, json) = app.get("/api/crypto/search?query=btc").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(symbols(&json["data"]), vec!["BTC"]);
    assert_eq!(app.upstream.hits_for("/cryptocurrency/map").len(), 0);
    assert_eq!(
        app.upstream.hits_for("/cryptocurrency/quotes/latest")[0].query["symbol"],
        "BTC"
    );
}

#[tokio::test]
async fn test_search_falls_back_to_names() {
    let app = TestApp::spawn(&["key-one-0123456789"]).await;

    let (status, json) = app.get("/api/crypto/search?query=coin").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(symbols(&json["data"]), vec!["BTC", "DOGE"]);

    let map_hits = app.upstream.hits_for("/cryptocurrency/map");
    assert_eq!(map_hits.len(), 1);
    assert_eq!(map_hits[0].query["limit"], "5000");
    assert_eq!(map_hits[0].query["listing_status"], "active");

    let quote_hits = app.upstream.hits_for("/cryptocurrency/quotes/latest");
    assert_eq!(quote_hits.len(), 2);
    assert_eq!(quote_hits[1].query["id"], "1,74");
}

#[tokio::test]
async fn test_search_fallback_respects_limit() {
    let app = TestApp::spawn(&["key-one-0123456789"]).await;

    let (status, json) = app.get("/api/crypto/search?query=coin&limit=1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(symbols(&json["data"]), vec!["BTC"]);
}

#[tokio::test]
async fn test_search_no_match_is_empty() {
    let app = TestApp::spawn(&["key-one-0123456789"]).await;

    let (status, json) = app.get("/api/crypto/search?query=zzz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"], serde_json::json!([]));
}

// ============================================================================
// Historical
// ============================================================================

#[tokio::test]
async fn test_historical_defaults() {
    let app = TestApp::spawn(&["key-one-0123456789"]).await;

    let (status, json) = app.get("/api/crypto/historical/1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["id"], "1");
    assert_eq!(json["data"]["interval"], "daily");
    assert_eq!(json["data"]["count"], "10");
    assert_eq!(json["data"]["convert"], "INR");
}

#[tokio::test]
async fn test_historical_forwards_range() {
    let app = TestApp::spawn(&["key-one-0123456789"]).await;

    let (status, _) = app
        .get("/api/crypto/historical/1?interval=hourly&count=3&time_start=2024-01-01&time_end=2024-01-02")
        .await;

    assert_eq!(status, StatusCode::OK);
    let query = &app.upstream.hits_for("/cryptocurrency/quotes/historical")[0].query;
    assert_eq!(query["interval"], "hourly");
    assert_eq!(query["count"], "3");
    assert_eq!(query["time_start"], "2024-01-01");
    assert_eq!(query["time_end"], "2024-01-02");
}

// ============================================================================
// Top Movers
// ============================================================================

#[tokio::test]
async fn test_top_movers() {
    let app = TestApp::spawn(&["key-one-0123456789"]).await;

    let (status, json) = app.get("/api/crypto/top-movers?limit=2").await;

    assert_eq!(status, StatusCode::OK);
    let gainers: Vec<&str> = json["data"]["gainers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["symbol"].as_str().unwrap())
        .collect();
    let losers: Vec<&str> = json["data"]["losers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["symbol"].as_str().unwrap())
        .collect();
    assert_eq!(gainers, vec!["DOGE", "BTC"]);
    // SOL has no change value and ranks as 0.
    assert_eq!(losers, vec!["ETH", "SOL"]);

    let query = &app.upstream.hits_for("/cryptocurrency/listings/latest")[0].query;
    assert_eq!(query["limit"], "100");
    assert_eq!(query["convert"], "INR");
}

// ============================================================================
// Top Fifty
// ============================================================================

#[tokio::test]
async fn test_top_fifty_is_cached() {
    let app = TestApp::spawn(&["key-one-0123456789"]).await;

    let (status, first) = app.get("/api/crypto/top-fifty").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["cached"], false);
    assert!(first["metadata"].is_object());

    let btc = &first["data"][0];
    assert_eq!(btc["symbol"], "BTC");
    assert_eq!(btc["price_usd"], 60_000.0);
    assert_eq!(btc["price_inr"], 5_000_000.0);
    assert_eq!(btc["percent_change_24h"], 2.5);
    assert!(btc["max_supply"].is_null());

    let (status, second) = app.get("/api/crypto/top-fifty").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["cached"], true);
    assert!(second.get("metadata").is_none());
    assert_eq!(second["data"], first["data"]);

    let hits = app.upstream.hits_for("/cryptocurrency/listings/latest");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].query["limit"], "50");
    assert_eq!(hits[0].query["convert"], "USD,INR");
}

// ============================================================================
// Upstream Failures
// ============================================================================

#[tokio::test]
async fn test_upstream_failure_envelope() {
    let app = TestApp::spawn(&["key-one-0123456789"]).await;
    app.upstream.set_failing(true);

    let (status, json) = app.get("/api/crypto/listings/latest").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Failed to fetch cryptocurrency listings");
    assert!(
        json["error"]
            .as_str()
            .is_some_and(|detail| detail.contains("500"))
    );
}

#[tokio::test]
async fn test_upstream_failure_hides_detail_in_production() {
    let config = Config {
        environment: Environment::Production,
        ..Config::default()
    };
    let app = TestApp::with_config(config, &["key-one-0123456789"]).await;
    app.upstream.set_failing(true);

    let (status, json) = app.get("/api/crypto/top-movers").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["message"], "Failed to fetch top gainers and losers");
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn test_top_fifty_refetched_after_expiry() {
    let app = TestApp::with_cache_ttl(Duration::from_millis(50), &["key-one-0123456789"]).await;

    app.get("/api/crypto/top-fifty").await;
    tokio::time::sleep(Duration::from_millis(120)).await;
    let (status, json) = app.get("/api/crypto/top-fifty").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cached"], false);
    assert_eq!(
        app.upstream
            .hits_for("/cryptocurrency/listings/latest")
            .len(),
        2
    );
}

#[tokio::test]
async fn test_failed_top_fifty_is_not_cached() {
    let app = TestApp::spawn(&["key-one-0123456789"]).await;
    app.upstream.set_failing(true);

    let (status, _) = app.get("/api/crypto/top-fifty").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    app.upstream.set_failing(false);
    let (status, json) = app.get("/api/crypto/top-fifty").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cached"], false);
}
