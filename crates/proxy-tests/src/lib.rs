//! Integration tests for the Crypto Market Proxy API.
//!
//! Each test drives the full router in-process against a mock market-data API
//! served by axum on an ephemeral local port. The mock records every call it
//! receives so tests can assert on forwarded parameters and on the API key
//! used for each request.

use axum::Router;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, Request, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use crypto_market_proxy::api::create_router;
use crypto_market_proxy::cache::ResponseCache;
use crypto_market_proxy::config::Config;
use crypto_market_proxy::db::{ActivityLog, MemoryActivityStore, MemoryFeedbackStore};
use crypto_market_proxy::state::AppState;
use http_body_util::BodyExt;
use market_client::{API_KEY_HEADER, ClientConfig, KeyRotator, MarketClient, MemoryKeyStore};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tower::ServiceExt;

/// IP the test client claims through `X-Forwarded-For`.
pub const CLIENT_IP: &str = "198.51.100.23";

// ============================================================================
// Fixtures
// ============================================================================

fn coin(id: u64, name: &str, symbol: &str, usd: f64, inr: f64, change_24h: Option<f64>) -> Value {
    let mut usd_quote = json!({
        "price": usd,
        "market_cap": usd * 1_000_000.0,
        "volume_24h": usd * 10_000.0,
    });
    let mut inr_quote = json!({ "price": inr });
    if let Some(change) = change_24h {
        usd_quote["percent_change_24h"] = json!(change);
        inr_quote["percent_change_24h"] = json!(change);
    }

    json!({
        "id": id,
        "name": name,
        "symbol": symbol,
        "circulating_supply": 1000,
        "total_supply": 2000,
        "max_supply": null,
        "last_updated": "2024-05-01T00:00:00.000Z",
        "quote": { "USD": usd_quote, "INR": inr_quote }
    })
}

/// Coins known to the mock upstream.
#[must_use]
pub fn fixture_coins() -> Vec<Value> {
    vec![
        coin(1, "Bitcoin", "BTC", 60_000.0, 5_000_000.0, Some(2.5)),
        coin(1027, "Ethereum", "ETH", 3_000.0, 250_000.0, Some(-3.0)),
        coin(74, "Dogecoin", "DOGE", 0.15, 12.5, Some(12.0)),
        coin(5426, "Solana", "SOL", 150.0, 12_500.0, None),
    ]
}

fn status_block() -> Value {
    json!({
        "timestamp": "2024-05-01T00:00:00.000Z",
        "error_code": 0,
        "error_message": null,
        "credit_count": 1
    })
}

fn upstream_error(code: StatusCode, message: &str) -> Response {
    (
        code,
        axum::Json(json!({
            "status": {
                "error_code": code.as_u16(),
                "error_message": message
            }
        })),
    )
        .into_response()
}

fn upstream_ok(data: Value) -> Response {
    axum::Json(json!({ "status": status_block(), "data": data })).into_response()
}

// ============================================================================
// Mock Upstream
// ============================================================================

/// A call received by the mock upstream.
#[derive(Debug, Clone)]
pub struct Hit {
    /// Endpoint path without the version prefix.
    pub path: String,
    /// Query parameters.
    pub query: HashMap<String, String>,
    /// Value of the API key header.
    pub api_key: Option<String>,
}

#[derive(Debug, Default)]
struct MockState {
    coins: Vec<Value>,
    hits: Mutex<Vec<Hit>>,
    failing: AtomicBool,
}

/// Mock market-data API.
#[derive(Debug, Clone)]
pub struct MockUpstream {
    addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockUpstream {
    /// Serves the fixture coins on an ephemeral port.
    pub async fn start() -> Self {
        let state = Arc::new(MockState {
            coins: fixture_coins(),
            ..Default::default()
        });
        let app = Router::new()
            .fallback(handle_upstream)
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("mock upstream should bind");
        let addr = listener.local_addr().expect("mock upstream address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    /// Base URL including the version prefix.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Makes every endpoint answer 500 while `failing` is set.
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    /// All calls received so far.
    #[must_use]
    pub fn hits(&self) -> Vec<Hit> {
        self.state.hits.lock().clone()
    }

    /// Calls received for `path`.
    #[must_use]
    pub fn hits_for(&self, path: &str) -> Vec<Hit> {
        self.hits().into_iter().filter(|h| h.path == path).collect()
    }
}

fn find_coins<'a>(coins: &'a [Value], field: &str, wanted: &str) -> Vec<&'a Value> {
    let wanted: Vec<&str> = wanted.split(',').map(str::trim).collect();
    coins
        .iter()
        .filter(|c| {
            let value = match &c[field] {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            wanted.contains(&value.as_str())
        })
        .collect()
}

async fn handle_upstream(
    State(mock): State<Arc<MockState>>,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let path = uri
        .path()
        .strip_prefix("/v1")
        .unwrap_or(uri.path())
        .to_string();
    mock.hits.lock().push(Hit {
        path: path.clone(),
        query: query.clone(),
        api_key: headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });

    if mock.failing.load(Ordering::SeqCst) {
        return upstream_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal error");
    }

    match path.as_str() {
        "/cryptocurrency/listings/latest" => upstream_ok(Value::Array(mock.coins.clone())),
        "/cryptocurrency/quotes/latest" => {
            let (field, wanted) = match (query.get("symbol"), query.get("id")) {
                (Some(symbol), _) => ("symbol", symbol),
                (None, Some(id)) => ("id", id),
                (None, None) => {
                    return upstream_error(StatusCode::BAD_REQUEST, "id or symbol is required");
                }
            };
            let found = find_coins(&mock.coins, field, wanted);
            if found.is_empty() {
                return upstream_error(
                    StatusCode::BAD_REQUEST,
                    &format!("Invalid value for \"{}\": \"{}\"", field, wanted),
                );
            }
            let data: serde_json::Map<String, Value> = found
                .into_iter()
                .map(|c| {
                    let key = match &c[field] {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (key, c.clone())
                })
                .collect();
            upstream_ok(Value::Object(data))
        }
        "/cryptocurrency/map" => {
            let entries: Vec<Value> = mock
                .coins
                .iter()
                .map(|c| json!({ "id": c["id"], "name": c["name"], "symbol": c["symbol"] }))
                .collect();
            upstream_ok(Value::Array(entries))
        }
        "/cryptocurrency/quotes/historical" => upstream_ok(json!({
            "id": query.get("id"),
            "interval": query.get("interval"),
            "count": query.get("count"),
            "convert": query.get("convert"),
            "quotes": []
        })),
        _ => upstream_error(StatusCode::NOT_FOUND, "Unknown endpoint"),
    }
}

// ============================================================================
// Application Under Test
// ============================================================================

/// The proxy router wired to a mock upstream and in-memory stores.
pub struct TestApp {
    /// Router under test.
    pub router: Router,
    /// Mock market-data API.
    pub upstream: MockUpstream,
    /// Activity store behind the router.
    pub activity: Arc<MemoryActivityStore>,
    /// Key store behind the rotator.
    pub keys: Arc<MemoryKeyStore>,
}

impl TestApp {
    /// Default configuration with the given upstream keys.
    pub async fn spawn(keys: &[&str]) -> Self {
        Self::with_config(Config::default(), keys).await
    }

    /// Custom configuration with the given upstream keys.
    pub async fn with_config(config: Config, keys: &[&str]) -> Self {
        Self::build(config, keys, ResponseCache::default()).await
    }

    /// Default configuration with a response cache of the given TTL.
    pub async fn with_cache_ttl(ttl: Duration, keys: &[&str]) -> Self {
        Self::build(Config::default(), keys, ResponseCache::new(ttl)).await
    }

    async fn build(config: Config, keys: &[&str], cache: ResponseCache) -> Self {
        let upstream = MockUpstream::start().await;
        let key_store = Arc::new(MemoryKeyStore::with_keys(keys));
        let rotator = Arc::new(KeyRotator::new(key_store.clone()));
        let market = MarketClient::new(
            ClientConfig {
                base_url: upstream.base_url(),
                timeout: Duration::from_secs(5),
            },
            rotator,
        )
        .expect("market client should build");

        let activity = Arc::new(MemoryActivityStore::new());
        let feedback = Arc::new(MemoryFeedbackStore::new());
        let state = AppState::with_stores(config, market, activity.clone(), feedback)
            .with_cache(cache);

        Self {
            router: create_router(Arc::new(state)),
            upstream,
            activity,
            keys: key_store,
        }
    }

    /// Sends a GET as [`CLIENT_IP`] and returns status and JSON body.
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .header("X-Forwarded-For", CLIENT_IP)
            .body(Body::empty())
            .expect("request should build");
        self.send(request).await
    }

    /// Sends a JSON POST as [`CLIENT_IP`] and returns status and JSON body.
    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("X-Forwarded-For", CLIENT_IP)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request should build");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should be readable")
            .to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    /// Waits until at least `count` activity entries are recorded.
    ///
    /// Activity is written by a background task after the response is sent.
    pub async fn wait_for_activity(&self, count: usize) -> Vec<ActivityLog> {
        for _ in 0..100 {
            if self.activity.len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.activity.entries()
    }
}
