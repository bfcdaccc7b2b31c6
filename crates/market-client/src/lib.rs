//! HTTP client library for the CoinMarketCap-style market-data API.
//!
//! Every request is authenticated with an API key chosen by a [`KeyRotator`],
//! which always hands out the least-used key from a [`KeyStore`] and persists
//! the updated usage counters.
//!
//! # Example
//!
//! ```no_run
//! use market_client::{ClientConfig, FileKeyStore, KeyRotator, ListingsParams, MarketClient};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), market_client::Error> {
//!     let store = FileKeyStore::new("config/apiKeys/coinmarketcap.json", None);
//!     let rotator = Arc::new(KeyRotator::new(Arc::new(store)));
//!     let client = MarketClient::new(
//!         ClientConfig {
//!             base_url: "https://pro-api.coinmarketcap.com/v1".into(),
//!             timeout: Duration::from_secs(10),
//!         },
//!         rotator,
//!     )?;
//!
//!     let listings = client
//!         .listings_latest(&ListingsParams {
//!             limit: Some(10),
//!             ..Default::default()
//!         })
//!         .await?;
//!     println!("{}", listings.data);
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod keys;
mod types;

pub use client::{API_KEY_HEADER, ClientConfig, DEFAULT_BASE_URL, MarketClient};
pub use error::{Error, KeyError};
pub use keys::{
    Credential, CredentialSet, DEFAULT_RATE_LIMIT, FileKeyStore, KeyRotator, KeyStore,
    MaskedCredential, MemoryKeyStore, mask_key,
};
pub use types::*;
