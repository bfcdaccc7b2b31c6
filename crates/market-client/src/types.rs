//! Request parameters and response shapes of the market-data API.

use crate::error::Error;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query for `/cryptocurrency/listings/latest`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingsParams {
    /// 1-based offset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,
    /// Number of results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Sort field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    /// Sort direction (`asc` or `desc`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_dir: Option<String>,
    /// Comma-separated quote currencies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convert: Option<String>,
}

/// Query for `/cryptocurrency/quotes/latest`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotesParams {
    /// Comma-separated coin ids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Comma-separated coin symbols.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Comma-separated quote currencies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convert: Option<String>,
}

/// Query for `/cryptocurrency/map`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapParams {
    /// Number of results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// `active`, `inactive` or `untracked`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_status: Option<String>,
}

/// Query for `/cryptocurrency/quotes/historical`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalParams {
    /// Coin id.
    pub id: String,
    /// Quote currency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convert: Option<String>,
    /// Sampling interval, e.g. `daily`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    /// Number of points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Range start (ISO 8601 or unix).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_start: Option<String>,
    /// Range end (ISO 8601 or unix).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<String>,
}

/// Upstream response: the `status` block plus the untouched `data` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamResponse {
    /// Upstream status metadata (timestamp, credit count, ...).
    #[serde(default)]
    pub status: Value,
    /// Endpoint-specific payload.
    #[serde(default)]
    pub data: Value,
}

impl UpstreamResponse {
    /// Deserializes the payload into `T`.
    ///
    /// # Errors
    /// Returns error if the payload does not match `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(T::deserialize(&self.data)?)
    }
}

/// Entry of `/cryptocurrency/map`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinMapEntry {
    /// Coin id.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// URL slug.
    #[serde(default)]
    pub slug: Option<String>,
}
