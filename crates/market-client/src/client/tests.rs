//! Unit tests for client module.

use super::*;
use crate::keys::MemoryKeyStore;

fn client_with_keys(base_url: &str, keys: &[&str]) -> MarketClient {
    let rotator = Arc::new(KeyRotator::new(Arc::new(MemoryKeyStore::with_keys(keys))));
    MarketClient::new(
        ClientConfig {
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(1),
        },
        rotator,
    )
    .expect("client should build")
}

// ============================================================================
// ClientConfig Tests
// ============================================================================

#[test]
fn test_client_config_default() {
    let config = ClientConfig::default();

    assert_eq!(config.base_url, "https://pro-api.coinmarketcap.com/v1");
    assert_eq!(config.timeout, Duration::from_secs(10));
}

// ============================================================================
// MarketClient Creation Tests
// ============================================================================

#[test]
fn test_market_client_base_url_trimmed() {
    let client = client_with_keys("http://localhost:9000/v1/", &["k"]);
    assert_eq!(client.base_url(), "http://localhost:9000/v1");
}

#[test]
fn test_market_client_rejects_invalid_url() {
    let rotator = Arc::new(KeyRotator::new(Arc::new(MemoryKeyStore::default())));
    let result = MarketClient::new(
        ClientConfig {
            base_url: "not a url".to_string(),
            timeout: Duration::from_secs(1),
        },
        rotator,
    );

    assert!(matches!(result, Err(Error::InvalidUrl(_))));
}

// ============================================================================
// URL Building Tests
// ============================================================================

#[test]
fn test_build_url_with_params() {
    let client = client_with_keys("http://localhost:9000/v1", &["k"]);
    let params = ListingsParams {
        start: Some(1),
        limit: Some(50),
        sort: Some("market_cap".to_string()),
        sort_dir: Some("desc".to_string()),
        convert: Some("USD,INR".to_string()),
    };

    let url = client
        .build_url("/cryptocurrency/listings/latest", &params)
        .unwrap();
    assert_eq!(
        url,
        "http://localhost:9000/v1/cryptocurrency/listings/latest?start=1&limit=50&sort=market_cap&sort_dir=desc&convert=USD%2CINR"
    );
}

#[test]
fn test_build_url_skips_missing_params() {
    let client = client_with_keys("http://localhost:9000/v1", &["k"]);
    let params = QuotesParams {
        symbol: Some("BTC".to_string()),
        ..Default::default()
    };

    let url = client
        .build_url("cryptocurrency/quotes/latest", &params)
        .unwrap();
    assert_eq!(
        url,
        "http://localhost:9000/v1/cryptocurrency/quotes/latest?symbol=BTC"
    );
}

#[test]
fn test_build_url_without_params() {
    let client = client_with_keys("http://localhost:9000/v1", &["k"]);
    let url = client
        .build_url("/cryptocurrency/map", &MapParams::default())
        .unwrap();
    assert_eq!(url, "http://localhost:9000/v1/cryptocurrency/map");
}

// ============================================================================
// Request Tests
// ============================================================================

#[tokio::test]
async fn test_request_without_keys_fails_fast() {
    // Port 9 (discard) is never contacted: the key check happens first.
    let client = client_with_keys("http://127.0.0.1:9", &[]);

    let result = client.listings_latest(&ListingsParams::default()).await;

    assert!(matches!(result, Err(Error::NoCredentials)));
}

#[test]
fn test_upstream_response_data_as() {
    let response = UpstreamResponse {
        status: serde_json::json!({ "error_code": 0 }),
        data: serde_json::json!([
            { "id": 1, "name": "Bitcoin", "symbol": "BTC", "slug": "bitcoin" },
            { "id": 1027, "name": "Ethereum", "symbol": "ETH" }
        ]),
    };

    let entries: Vec<CoinMapEntry> = response.data_as().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].slug.as_deref(), Some("bitcoin"));
    assert_eq!(entries[1].id, 1027);
    assert_eq!(entries[1].slug, None);
}

#[test]
fn test_upstream_response_missing_fields_default() {
    let response: UpstreamResponse = serde_json::from_str("{}").unwrap();
    assert!(response.status.is_null());
    assert!(response.data.is_null());
}
