//! Common market data types shared by all providers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Asset class of a refreshed instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Stock,
    Fx,
    Crypto,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Stock => "stock",
            AssetClass::Fx => "fx",
            AssetClass::Crypto => "crypto",
        }
    }

    /// Label used in progress messages
    pub fn label(&self) -> &'static str {
        match self {
            AssetClass::Stock => "stock",
            AssetClass::Fx => "FX",
            AssetClass::Crypto => "crypto",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stock" => Ok(AssetClass::Stock),
            "fx" => Ok(AssetClass::Fx),
            "crypto" => Ok(AssetClass::Crypto),
            other => Err(format!("kind must be stock|fx|crypto, got '{}'", other)),
        }
    }
}

/// An instrument to fetch from the provider
///
/// `symbol` is the display identity (`AAPL`, `EUR/USD`, `BTC`); `base` and
/// `quote` are the provider-facing parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instrument {
    pub asset_class: AssetClass,
    pub symbol: String,
    pub base: String,
    pub quote: Option<String>,
}

impl Instrument {
    pub fn stock(symbol: &str) -> Self {
        let symbol = symbol.trim().to_uppercase();
        Self {
            asset_class: AssetClass::Stock,
            base: symbol.clone(),
            symbol,
            quote: None,
        }
    }

    pub fn fx(from_symbol: &str, to_symbol: &str) -> Self {
        let from = from_symbol.trim().to_uppercase();
        let to = to_symbol.trim().to_uppercase();
        Self {
            asset_class: AssetClass::Fx,
            symbol: format!("{}/{}", from, to),
            base: from,
            quote: Some(to),
        }
    }

    pub fn crypto(symbol: &str, market: &str) -> Self {
        let symbol = symbol.trim().to_uppercase();
        Self {
            asset_class: AssetClass::Crypto,
            base: symbol.clone(),
            symbol,
            quote: Some(market.trim().to_uppercase()),
        }
    }
}

/// Requested history depth for daily series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputSize {
    #[default]
    Compact,
    Full,
}

impl OutputSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputSize::Compact => "compact",
            OutputSize::Full => "full",
        }
    }
}

/// Bar size for intraday series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IntradayInterval {
    #[serde(rename = "1min")]
    OneMinute,
    #[default]
    #[serde(rename = "5min")]
    FiveMinutes,
    #[serde(rename = "15min")]
    FifteenMinutes,
    #[serde(rename = "30min")]
    ThirtyMinutes,
    #[serde(rename = "60min")]
    SixtyMinutes,
}

impl IntradayInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntradayInterval::OneMinute => "1min",
            IntradayInterval::FiveMinutes => "5min",
            IntradayInterval::FifteenMinutes => "15min",
            IntradayInterval::ThirtyMinutes => "30min",
            IntradayInterval::SixtyMinutes => "60min",
        }
    }
}

impl FromStr for IntradayInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1min" => Ok(IntradayInterval::OneMinute),
            "" | "5min" => Ok(IntradayInterval::FiveMinutes),
            "15min" => Ok(IntradayInterval::FifteenMinutes),
            "30min" => Ok(IntradayInterval::ThirtyMinutes),
            "60min" => Ok(IntradayInterval::SixtyMinutes),
            other => Err(format!(
                "interval must be 1min|5min|15min|30min|60min, got '{}'",
                other
            )),
        }
    }
}

impl FromStr for OutputSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "compact" => Ok(OutputSize::Compact),
            "full" => Ok(OutputSize::Full),
            other => Err(format!("outputsize must be compact|full, got '{}'", other)),
        }
    }
}

/// One daily close
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: String,
    pub close: Option<f64>,
}

/// Daily close history, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    pub symbol: Option<String>,
    pub last_refreshed: Option<String>,
    pub points: Vec<PricePoint>,
}

impl DailySeries {
    /// Most recent close, if any
    pub fn latest_close(&self) -> Option<f64> {
        self.points.first().and_then(|p| p.close)
    }
}

/// Intraday bars for a stock, newest first; `date` holds the bar timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntradaySeries {
    pub symbol: Option<String>,
    pub interval: IntradayInterval,
    pub last_refreshed: Option<String>,
    pub points: Vec<PricePoint>,
}

/// Latest quote for a single stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Option<String>,
    pub price: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<String>,
    pub volume: Option<f64>,
    pub latest_trading_day: Option<String>,
}

/// News query parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NewsQuery {
    pub tickers: Option<String>,
    pub topics: Option<String>,
    pub time_from: Option<String>,
    pub time_to: Option<String>,
    pub sort: String,
    pub limit: u32,
}

impl Default for NewsQuery {
    fn default() -> Self {
        Self {
            tickers: None,
            topics: None,
            time_from: None,
            time_to: None,
            sort: "LATEST".to_string(),
            limit: 50,
        }
    }
}

impl NewsQuery {
    /// Broad market news used by the market overview refresh
    pub fn market_overview() -> Self {
        Self {
            topics: Some("financial_markets".to_string()),
            limit: 200,
            ..Self::default()
        }
    }
}

/// Per-ticker sentiment attached to a news article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSentiment {
    pub ticker: String,
    pub score: Option<f64>,
}

/// A single news article with sentiment scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: Option<String>,
    pub url: Option<String>,
    pub time_published: Option<String>,
    pub source: Option<String>,
    pub overall_sentiment_score: Option<f64>,
    pub overall_sentiment_label: Option<String>,
    pub ticker_sentiment: Vec<TickerSentiment>,
}

/// News feed returned by the provider
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewsFeed {
    pub articles: Vec<NewsArticle>,
}

/// Listing state filter for the universe listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingState {
    #[default]
    Active,
    Delisted,
}

impl ListingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingState::Active => "active",
            ListingState::Delisted => "delisted",
        }
    }
}

impl FromStr for ListingState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "active" => Ok(ListingState::Active),
            "delisted" => Ok(ListingState::Delisted),
            other => Err(format!("state must be active|delisted, got '{}'", other)),
        }
    }
}

/// One row of the tradable universe listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRow {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub ipo_date: Option<String>,
    #[serde(default)]
    pub delisting_date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_identity() {
        let fx = Instrument::fx("eur", "usd");
        assert_eq!(fx.symbol, "EUR/USD");
        assert_eq!(fx.base, "EUR");
        assert_eq!(fx.quote.as_deref(), Some("USD"));

        let crypto = Instrument::crypto("btc", "usd");
        assert_eq!(crypto.symbol, "BTC");
        assert_eq!(crypto.asset_class, AssetClass::Crypto);
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("FX".parse::<AssetClass>().unwrap(), AssetClass::Fx);
        assert!("bond".parse::<AssetClass>().is_err());
        assert_eq!("".parse::<ListingState>().unwrap(), ListingState::Active);
        assert_eq!("Delisted".parse::<ListingState>().unwrap(), ListingState::Delisted);
        assert!("pending".parse::<ListingState>().is_err());
        assert_eq!("15MIN".parse::<IntradayInterval>().unwrap(), IntradayInterval::FifteenMinutes);
        assert_eq!("".parse::<IntradayInterval>().unwrap(), IntradayInterval::FiveMinutes);
        assert!("2min".parse::<IntradayInterval>().is_err());
        assert_eq!("Full".parse::<OutputSize>().unwrap(), OutputSize::Full);
        assert!("huge".parse::<OutputSize>().is_err());
    }
}
