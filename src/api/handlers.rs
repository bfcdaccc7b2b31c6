//! Market-data request handlers.

use crate::api::extract::{ApiPath, ApiQuery, ClientIp};
use crate::api::shaping::{
    SortDir, Timeframe, filter_map_entries, listing_sort, movers_pool_size, payload_values,
    split_movers,
};
use crate::error::ApiError;
use crate::models::{
    ConvertQuery, HealthResponse, HistoricalQuery, ListingsQuery, MarketDataResponse,
    SearchQuery, TopCoin, TopMoversQuery,
};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use market_client::{CoinMapEntry, HistoricalParams, ListingsParams, MapParams, QuotesParams};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

/// Quote currency used when the caller names none.
pub const DEFAULT_CONVERT: &str = "INR";

/// Cache key of the top-fifty payload.
pub const TOP_FIFTY_CACHE_KEY: &str = "top50cryptos";

/// Coin map entries scanned by the search fallback.
const SEARCH_MAP_LIMIT: u32 = 5000;

fn convert_or_default(convert: Option<String>) -> String {
    convert
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CONVERT.to_string())
}

// ============================================================================
// Health Check
// ============================================================================

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Listings
// ============================================================================

/// Latest listings, forwarded to the upstream API.
#[utoipa::path(
    get,
    path = "/api/crypto/listings/latest",
    params(ListingsQuery),
    responses(
        (status = 200, description = "Latest listings", body = MarketDataResponse),
        (status = 500, description = "Upstream failure", body = crate::error::ErrorResponse)
    ),
    tag = "Crypto"
)]
pub async fn get_latest_listings(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    ApiQuery(query): ApiQuery<ListingsQuery>,
) -> Result<Json<MarketDataResponse>, ApiError> {
    let params = ListingsParams {
        start: Some(query.start.unwrap_or(1).max(1)),
        limit: Some(query.limit.unwrap_or(100)),
        sort: Some(listing_sort(query.sort.as_deref()).to_string()),
        sort_dir: Some(SortDir::parse(query.sort_dir.as_deref()).as_str().to_string()),
        convert: Some(convert_or_default(query.convert)),
    };

    let response = state
        .market
        .listings_latest(&params)
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch cryptocurrency listings", e))?;

    state.log_activity(&ip, "getLatestListings", json!(params));

    Ok(Json(MarketDataResponse::new(response.data, response.status)))
}

// ============================================================================
// Details
// ============================================================================

/// Latest quote of one coin.
#[utoipa::path(
    get,
    path = "/api/crypto/info/{id}",
    params(
        ("id" = String, Path, description = "Upstream coin id"),
        ConvertQuery
    ),
    responses(
        (status = 200, description = "Coin quote", body = MarketDataResponse),
        (status = 400, description = "Missing id", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown id", body = crate::error::ErrorResponse),
        (status = 500, description = "Upstream failure", body = crate::error::ErrorResponse)
    ),
    tag = "Crypto"
)]
pub async fn get_crypto_details(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    ApiPath(id): ApiPath<String>,
    ApiQuery(query): ApiQuery<ConvertQuery>,
) -> Result<Json<MarketDataResponse>, ApiError> {
    let id = id.trim().to_string();
    if id.is_empty() {
        return Err(ApiError::InvalidRequest(
            "Cryptocurrency ID is required".to_string(),
        ));
    }
    let convert = convert_or_default(query.convert);

    let response = state
        .market
        .quotes_latest(&QuotesParams {
            id: Some(id.clone()),
            symbol: None,
            convert: Some(convert.clone()),
        })
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch cryptocurrency details", e))?;

    let data = response
        .data
        .get(&id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("Cryptocurrency {} not found", id)))?;

    state.log_activity(&ip, "getCryptoDetails", json!({ "id": id, "convert": convert }));

    Ok(Json(MarketDataResponse::new(data, response.status)))
}

// ============================================================================
// Search
// ============================================================================

/// Search by exact symbol, falling back to a name/symbol substring match.
#[utoipa::path(
    get,
    path = "/api/crypto/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching quotes, possibly empty", body = MarketDataResponse),
        (status = 400, description = "Missing query", body = crate::error::ErrorResponse),
        (status = 500, description = "Upstream failure", body = crate::error::ErrorResponse)
    ),
    tag = "Crypto"
)]
pub async fn search_cryptocurrencies(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<MarketDataResponse>, ApiError> {
    let search = query
        .query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("Search query is required".to_string()))?;
    let limit = query.limit.unwrap_or(10);
    let convert = convert_or_default(query.convert);
    let fail = |e| ApiError::upstream("Failed to search cryptocurrencies", e);

    let by_symbol = state
        .market
        .quotes_latest(&QuotesParams {
            id: None,
            symbol: Some(search.to_uppercase()),
            convert: Some(convert.clone()),
        })
        .await;

    let response = match by_symbol {
        Ok(response) => response,
        Err(e) => {
            info!("Symbol lookup for {} failed ({}), searching by name", search, e);

            let map = state
                .market
                .coin_map(&MapParams {
                    limit: Some(SEARCH_MAP_LIMIT),
                    listing_status: Some("active".to_string()),
                })
                .await
                .map_err(fail)?;
            let entries: Vec<CoinMapEntry> = map.data_as().map_err(fail)?;
            let matches = filter_map_entries(&entries, &search, limit as usize);

            if matches.is_empty() {
                state.log_activity(
                    &ip,
                    "searchCryptocurrencies",
                    json!({ "query": search, "limit": limit, "convert": convert }),
                );
                return Ok(Json(MarketDataResponse::new(json!([]), map.status)));
            }

            let ids = matches
                .iter()
                .map(|e| e.id.to_string())
                .collect::<Vec<_>>()
                .join(",");

            state
                .market
                .quotes_latest(&QuotesParams {
                    id: Some(ids),
                    symbol: None,
                    convert: Some(convert.clone()),
                })
                .await
                .map_err(fail)?
        }
    };

    state.log_activity(
        &ip,
        "searchCryptocurrencies",
        json!({ "query": search, "limit": limit, "convert": convert }),
    );

    Ok(Json(MarketDataResponse::new(
        Value::Array(payload_values(&response.data)),
        response.status,
    )))
}

// ============================================================================
// Historical
// ============================================================================

/// Historical quotes of one coin.
#[utoipa::path(
    get,
    path = "/api/crypto/historical/{id}",
    params(
        ("id" = String, Path, description = "Upstream coin id"),
        HistoricalQuery
    ),
    responses(
        (status = 200, description = "Historical quotes", body = MarketDataResponse),
        (status = 400, description = "Missing id", body = crate::error::ErrorResponse),
        (status = 500, description = "Upstream failure", body = crate::error::ErrorResponse)
    ),
    tag = "Crypto"
)]
pub async fn get_historical_data(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    ApiPath(id): ApiPath<String>,
    ApiQuery(query): ApiQuery<HistoricalQuery>,
) -> Result<Json<MarketDataResponse>, ApiError> {
    let id = id.trim().to_string();
    if id.is_empty() {
        return Err(ApiError::InvalidRequest(
            "Cryptocurrency ID is required".to_string(),
        ));
    }

    let params = HistoricalParams {
        id,
        convert: Some(convert_or_default(query.convert)),
        interval: Some(
            query
                .interval
                .filter(|i| !i.trim().is_empty())
                .unwrap_or_else(|| "daily".to_string()),
        ),
        count: Some(query.count.unwrap_or(10)),
        time_start: query.time_start.filter(|t| !t.is_empty()),
        time_end: query.time_end.filter(|t| !t.is_empty()),
    };

    let response = state
        .market
        .quotes_historical(&params)
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch historical data", e))?;

    state.log_activity(
        &ip,
        "getHistoricalData",
        json!({
            "id": params.id,
            "convert": params.convert,
            "interval": params.interval,
            "count": params.count,
        }),
    );

    Ok(Json(MarketDataResponse::new(response.data, response.status)))
}

// ============================================================================
// Top Movers
// ============================================================================

/// Top gainers and losers over a timeframe.
#[utoipa::path(
    get,
    path = "/api/crypto/top-movers",
    params(TopMoversQuery),
    responses(
        (status = 200, description = "Gainers and losers", body = MarketDataResponse),
        (status = 500, description = "Upstream failure", body = crate::error::ErrorResponse)
    ),
    tag = "Crypto"
)]
pub async fn get_top_movers(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    ApiQuery(query): ApiQuery<TopMoversQuery>,
) -> Result<Json<MarketDataResponse>, ApiError> {
    let limit = query.limit.unwrap_or(10);
    let convert = convert_or_default(query.convert);
    let timeframe_arg = query.timeframe.unwrap_or_else(|| "24h".to_string());
    let timeframe = Timeframe::parse(Some(&timeframe_arg));
    let fail = |e| ApiError::upstream("Failed to fetch top gainers and losers", e);

    let response = state
        .market
        .listings_latest(&ListingsParams {
            limit: Some(movers_pool_size(limit)),
            convert: Some(convert.clone()),
            ..Default::default()
        })
        .await
        .map_err(fail)?;

    let pool: Vec<Value> = response.data_as().map_err(fail)?;
    let movers = split_movers(pool, &convert, timeframe, limit as usize);

    state.log_activity(
        &ip,
        "getTopGainersLosers",
        json!({ "limit": limit, "convert": convert, "timeframe": timeframe_arg }),
    );

    let data = serde_json::to_value(movers)
        .map_err(|e| ApiError::internal("Failed to fetch top gainers and losers", e))?;
    Ok(Json(MarketDataResponse::new(data, response.status)))
}

// ============================================================================
// Top Fifty
// ============================================================================

/// Top fifty coins by market cap, served from the response cache when fresh.
#[utoipa::path(
    get,
    path = "/api/crypto/top-fifty",
    responses(
        (status = 200, description = "Top fifty coins, with a cached flag", body = MarketDataResponse),
        (status = 500, description = "Upstream failure", body = crate::error::ErrorResponse)
    ),
    tag = "Crypto"
)]
pub async fn get_top_fifty(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
) -> Result<Json<MarketDataResponse>, ApiError> {
    if let Some(data) = state.cache.get(TOP_FIFTY_CACHE_KEY) {
        info!("Returning cached top 50 cryptocurrencies data");
        return Ok(Json(MarketDataResponse {
            success: true,
            data,
            metadata: None,
            cached: Some(true),
        }));
    }

    let params = ListingsParams {
        start: None,
        limit: Some(50),
        sort: Some("market_cap".to_string()),
        sort_dir: Some("desc".to_string()),
        convert: Some("USD,INR".to_string()),
    };
    let fail = |e| ApiError::upstream("Failed to fetch top 50 cryptocurrencies", e);

    let response = state.market.listings_latest(&params).await.map_err(fail)?;
    let listings: Vec<Value> = response.data_as().map_err(fail)?;
    let coins: Vec<TopCoin> = listings.iter().map(TopCoin::from_listing).collect();
    let data = serde_json::to_value(coins)
        .map_err(|e| ApiError::internal("Failed to fetch top 50 cryptocurrencies", e))?;

    state.cache.set(TOP_FIFTY_CACHE_KEY, data.clone());
    state.log_activity(&ip, "getTopFiftyCryptos", json!(params));

    Ok(Json(MarketDataResponse {
        success: true,
        data,
        metadata: Some(response.status),
        cached: Some(false),
    }))
}
