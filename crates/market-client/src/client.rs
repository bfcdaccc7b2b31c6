//! HTTP client for the market-data API.

use crate::error::Error;
use crate::keys::KeyRotator;
use crate::types::*;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[cfg(test)]
mod tests;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

/// Production base URL.
pub const DEFAULT_BASE_URL: &str = "https://pro-api.coinmarketcap.com/v1";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API (e.g., "https://pro-api.coinmarketcap.com/v1").
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// HTTP client for the market-data API.
///
/// Each call takes a fresh key from the rotator. Failures are returned as-is:
/// there is no retry and no second key for the same call.
#[derive(Debug, Clone)]
pub struct MarketClient {
    client: Client,
    base_url: String,
    rotator: Arc<KeyRotator>,
}

impl MarketClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: ClientConfig, rotator: Arc<KeyRotator>) -> Result<Self, Error> {
        url::Url::parse(&config.base_url)?;
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rotator,
        })
    }

    /// Base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The key rotator used for authentication.
    #[must_use]
    pub fn rotator(&self) -> &Arc<KeyRotator> {
        &self.rotator
    }

    /// Issues a GET to `endpoint` with `params` as query string.
    ///
    /// # Errors
    /// Returns [`Error::NoCredentials`] when no key is available, and
    /// [`Error::Upstream`] / [`Error::Http`] when the call fails.
    pub async fn request<P>(&self, endpoint: &str, params: &P) -> Result<UpstreamResponse, Error>
    where
        P: Serialize + ?Sized,
    {
        let url = self.build_url(endpoint, params)?;
        let api_key = self.rotator.spawn_blocking(KeyRotator::select_key).await?;

        let result = match self
            .client
            .get(&url)
            .header(API_KEY_HEADER, api_key)
            .header(ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(resp) => self.handle_response(resp).await,
            Err(e) => Err(Error::from(e)),
        };

        match &result {
            Ok(_) => info!("API request successful: {}", endpoint),
            Err(e) => {
                error!("API request failed: {}", e);
                if let Some(status) = e.status() {
                    error!("Status: {}", status);
                }
                if let Some(body) = e.body() {
                    error!("Data: {}", body);
                }
            }
        }

        result
    }

    // ========================================================================
    // Cryptocurrency endpoints
    // ========================================================================

    /// Latest listings.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn listings_latest(&self, params: &ListingsParams) -> Result<UpstreamResponse, Error> {
        self.request("/cryptocurrency/listings/latest", params).await
    }

    /// Latest quotes by id or symbol.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn quotes_latest(&self, params: &QuotesParams) -> Result<UpstreamResponse, Error> {
        self.request("/cryptocurrency/quotes/latest", params).await
    }

    /// Id/name/symbol map of all coins.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn coin_map(&self, params: &MapParams) -> Result<UpstreamResponse, Error> {
        self.request("/cryptocurrency/map", params).await
    }

    /// Historical quotes.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn quotes_historical(
        &self,
        params: &HistoricalParams,
    ) -> Result<UpstreamResponse, Error> {
        self.request("/cryptocurrency/quotes/historical", params).await
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    fn build_url<P>(&self, endpoint: &str, params: &P) -> Result<String, Error>
    where
        P: Serialize + ?Sized,
    {
        let mut url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        let query = serde_urlencoded::to_string(params)?;
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        Ok(url)
    }

    async fn handle_response(&self, resp: reqwest::Response) -> Result<UpstreamResponse, Error> {
        let status = resp.status();

        if status.is_success() {
            Ok(resp.json().await?)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(Error::Upstream {
                status: status.as_u16(),
                body,
            })
        }
    }
}
