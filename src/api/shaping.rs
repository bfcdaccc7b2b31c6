//! Transformations applied to upstream payloads before they are returned.

use crate::models::{TopCoin, TopMovers};
use market_client::CoinMapEntry;
use serde_json::Value;

/// Sort fields accepted by the listings endpoint.
pub const LISTING_SORT_FIELDS: &[&str] = &[
    "market_cap",
    "market_cap_strict",
    "name",
    "symbol",
    "date_added",
    "price",
    "circulating_supply",
    "total_supply",
    "max_supply",
    "num_market_pairs",
    "volume_24h",
    "volume_7d",
    "volume_30d",
    "percent_change_1h",
    "percent_change_24h",
    "percent_change_7d",
];

/// Sort field used when none or an unknown one is requested.
pub const DEFAULT_LISTING_SORT: &str = "market_cap";

/// Maps a requested sort field onto the allow-list.
#[must_use]
pub fn listing_sort(requested: Option<&str>) -> &'static str {
    requested
        .and_then(|r| LISTING_SORT_FIELDS.iter().copied().find(|f| *f == r))
        .unwrap_or(DEFAULT_LISTING_SORT)
}

/// Sort direction of listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    /// Ascending.
    Asc,
    /// Descending.
    #[default]
    Desc,
}

impl SortDir {
    /// Parses `asc`/`desc` case-insensitively; anything else is `Desc`.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("asc") => Self::Asc,
            _ => Self::Desc,
        }
    }

    /// Upstream representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Window of the percent change used to rank movers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeframe {
    /// Last hour.
    OneHour,
    /// Last 24 hours.
    #[default]
    OneDay,
    /// Last 7 days.
    SevenDays,
    /// Last 30 days.
    ThirtyDays,
}

impl Timeframe {
    /// Parses `1h`, `7d` or `30d`; anything else is 24 hours.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("1h") => Self::OneHour,
            Some("7d") => Self::SevenDays,
            Some("30d") => Self::ThirtyDays,
            _ => Self::OneDay,
        }
    }

    /// Quote field holding the change for this window.
    #[must_use]
    pub fn field(self) -> &'static str {
        match self {
            Self::OneHour => "percent_change_1h",
            Self::OneDay => "percent_change_24h",
            Self::SevenDays => "percent_change_7d",
            Self::ThirtyDays => "percent_change_30d",
        }
    }
}

/// Number of listings fetched to rank `limit` movers per side.
#[must_use]
pub fn movers_pool_size(limit: u32) -> u32 {
    limit.saturating_mul(5).max(100)
}

/// Percent change of `coin` in `convert` for `timeframe`; missing is 0.
#[must_use]
pub fn percent_change(coin: &Value, convert: &str, timeframe: Timeframe) -> f64 {
    coin.get("quote")
        .and_then(|q| q.get(convert))
        .and_then(|q| q.get(timeframe.field()))
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}

/// Ranks `pool` by change and takes `limit` from each end.
///
/// Gainers are the head of the descending order, losers its tail reversed.
/// With fewer than `2 * limit` entries the two lists overlap.
#[must_use]
pub fn split_movers(
    mut pool: Vec<Value>,
    convert: &str,
    timeframe: Timeframe,
    limit: usize,
) -> TopMovers {
    pool.sort_by(|a, b| {
        percent_change(b, convert, timeframe).total_cmp(&percent_change(a, convert, timeframe))
    });

    let take = limit.min(pool.len());
    let gainers = pool[..take].to_vec();
    let losers = pool[pool.len() - take..].iter().rev().cloned().collect();

    TopMovers { gainers, losers }
}

/// Coins whose name or symbol contains `query`, case-insensitively.
#[must_use]
pub fn filter_map_entries<'a>(
    entries: &'a [CoinMapEntry],
    query: &str,
    limit: usize,
) -> Vec<&'a CoinMapEntry> {
    let needle = query.to_lowercase();
    entries
        .iter()
        .filter(|e| {
            e.name.to_lowercase().contains(&needle) || e.symbol.to_lowercase().contains(&needle)
        })
        .take(limit)
        .collect()
}

/// Values of an id- or symbol-keyed quotes payload.
#[must_use]
pub fn payload_values(data: &Value) -> Vec<Value> {
    match data {
        Value::Object(map) => map.values().cloned().collect(),
        Value::Array(items) => items.clone(),
        _ => Vec::new(),
    }
}

impl TopCoin {
    /// Projects a listing entry quoted in `USD,INR`.
    #[must_use]
    pub fn from_listing(coin: &Value) -> Self {
        let field = |name: &str| coin.get(name).cloned().unwrap_or(Value::Null);
        let quote = |currency: &str, name: &str| {
            coin.get("quote")
                .and_then(|q| q.get(currency))
                .and_then(|q| q.get(name))
                .cloned()
                .unwrap_or(Value::Null)
        };

        Self {
            id: field("id"),
            name: field("name"),
            symbol: field("symbol"),
            price_usd: quote("USD", "price"),
            price_inr: quote("INR", "price"),
            market_cap: quote("USD", "market_cap"),
            percent_change_24h: quote("USD", "percent_change_24h"),
            volume_24h: quote("USD", "volume_24h"),
            circulating_supply: field("circulating_supply"),
            total_supply: field("total_supply"),
            max_supply: field("max_supply"),
            last_updated: field("last_updated"),
        }
    }
}
