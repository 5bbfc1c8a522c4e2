//! REST API request and response types

use crate::db::Snapshot;
use crate::providers::types::{NewsQuery, OutputSize};
use crate::services::RefreshStatus;
use serde::{Deserialize, Serialize};

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// Refresh status wrapper - GET /report/market-overview/refresh-status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: RefreshStatus,
}

/// Latest snapshot wrapper - GET /report/market-overview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestResponse {
    pub latest: Option<Snapshot>,
}

/// Snapshot history wrapper - GET /report/market-overview/history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<Snapshot>,
}

// ============================================================================
// Query parameters
// ============================================================================

/// Numeric fields stay strings so bad input is reported as a validation error
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteQuery {
    #[serde(default)]
    pub symbol: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StockDailyQuery {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub outputsize: OutputSize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StockIntradayQuery {
    #[serde(default)]
    pub symbol: String,
    pub interval: Option<String>,
    pub outputsize: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FxDailyQuery {
    #[serde(default)]
    pub from_symbol: String,
    #[serde(default)]
    pub to_symbol: String,
    #[serde(default)]
    pub outputsize: OutputSize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CryptoDailyQuery {
    #[serde(default)]
    pub symbol: String,
    #[serde(default = "default_market")]
    pub market: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UniverseQuery {
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsSentimentQuery {
    pub tickers: Option<String>,
    pub topics: Option<String>,
    pub time_from: Option<String>,
    pub time_to: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<u32>,
}

impl From<NewsSentimentQuery> for NewsQuery {
    fn from(q: NewsSentimentQuery) -> Self {
        let defaults = NewsQuery::default();
        NewsQuery {
            tickers: q.tickers,
            topics: q.topics,
            time_from: q.time_from,
            time_to: q.time_to,
            sort: q.sort.unwrap_or(defaults.sort),
            limit: q.limit.unwrap_or(defaults.limit),
        }
    }
}

fn default_market() -> String {
    "USD".to_string()
}
