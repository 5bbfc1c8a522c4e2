//! Market data provider adapters

pub mod types;
pub mod cache;
pub mod alphavantage;

use async_trait::async_trait;
use thiserror::Error;
use types::*;

pub use alphavantage::AlphaVantageProvider;

/// Errors raised by a market data provider
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider throttled the request; waiting and retrying may succeed
    #[error("Rate limited by provider: {0}")]
    RateLimited(String),

    #[error("Provider returned an error: {0}")]
    Upstream(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected provider payload: {0}")]
    Decode(String),

    #[error("No Alpha Vantage API keys configured")]
    NoApiKeys,
}

impl ProviderError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::RateLimited(_))
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Provider trait that all market data sources must implement
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily close history for a stock, FX pair or crypto asset
    async fn daily_series(
        &self,
        instrument: &Instrument,
        output_size: OutputSize,
    ) -> ProviderResult<DailySeries>;

    /// Intraday bars for a stock symbol
    async fn intraday_series(
        &self,
        symbol: &str,
        interval: IntradayInterval,
        output_size: OutputSize,
    ) -> ProviderResult<IntradaySeries>;

    /// Latest quote for a stock symbol
    async fn global_quote(&self, symbol: &str) -> ProviderResult<Quote>;

    /// News articles with sentiment scores
    async fn news_sentiment(&self, query: &NewsQuery) -> ProviderResult<NewsFeed>;

    /// Tradable universe listing
    async fn listing_status(&self, state: ListingState) -> ProviderResult<Vec<ListingRow>>;
}
