//! Report Service
//!
//! Builds a combined market + sentiment report for a single asset:
//! - stock: quote + daily series
//! - fx: daily series of the pair
//! - crypto: daily series against the market currency
//!
//! News sentiment is optional and defaults to the asset's own ticker.

use crate::analytics::{aggregate_news_sentiment, NewsSummary};
use crate::error::{AppError, Result};
use crate::providers::types::{AssetClass, Instrument, NewsQuery, OutputSize, Quote};
use crate::services::market_service::{required, MarketService, SeriesReport, MAX_NEWS_LIMIT};
use crate::state::AppState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

const MOOD_THRESHOLD: f64 = 0.15;

const REPORT_NOTES: [&str; 2] = [
    "This report summarizes publicly available data and sentiment. It is not investment advice.",
    "Consider validating signals with fundamentals, risk limits, and multiple data sources.",
];

/// Parameters of an asset report
#[derive(Debug, Clone, Deserialize)]
pub struct AssetReportRequest {
    pub kind: AssetClass,
    pub symbol: Option<String>,
    pub from_symbol: Option<String>,
    pub to_symbol: Option<String>,
    #[serde(default = "default_market")]
    pub market: String,
    pub tickers_for_news: Option<String>,
    pub topics: Option<String>,
    #[serde(default = "default_include_news")]
    pub include_news: bool,
    #[serde(default = "default_news_limit")]
    pub news_limit: u32,
}

fn default_market() -> String {
    "USD".to_string()
}

fn default_include_news() -> bool {
    true
}

fn default_news_limit() -> u32 {
    50
}

/// Market part of an asset report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<Quote>,
    pub daily: SeriesReport,
}

/// Rendered asset report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetReport {
    pub generated_at: DateTime<Utc>,
    pub sentiment_mood: String,
    pub sentiment_score: Option<f64>,
    pub market_snapshot: MarketSnapshot,
    pub notes: Vec<String>,
}

/// Report plus the news summary it was built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetReportResult {
    pub report: AssetReport,
    pub news: NewsSummary,
}

/// Report service for business logic
pub struct ReportService;

impl ReportService {
    /// Build a report for one stock, FX pair or crypto asset
    pub async fn asset_report(state: &AppState, req: &AssetReportRequest) -> Result<AssetReportResult> {
        if !(1..=MAX_NEWS_LIMIT).contains(&req.news_limit) {
            return Err(AppError::Validation(format!(
                "news_limit must be between 1 and {}, got {}",
                MAX_NEWS_LIMIT, req.news_limit
            )));
        }

        let (instrument, default_news_ticker) = Self::resolve(req)?;
        info!("ReportService::asset_report - {} {}", req.kind, instrument.symbol);

        let quote = match req.kind {
            AssetClass::Stock => Some(MarketService::quote(state, &instrument.base).await?),
            _ => None,
        };
        let daily = MarketService::daily(state, &instrument, OutputSize::Compact).await?;

        let tickers = req
            .tickers_for_news
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(default_news_ticker);

        let news = if req.include_news {
            state.pace_pass_through().await;
            let query = NewsQuery {
                tickers: Some(tickers),
                topics: req.topics.clone(),
                limit: req.news_limit,
                ..NewsQuery::default()
            };
            aggregate_news_sentiment(&state.provider.news_sentiment(&query).await?)
        } else {
            NewsSummary::default()
        };

        let report = build_report(MarketSnapshot { quote, daily }, &news);
        Ok(AssetReportResult { report, news })
    }

    /// Instrument and default news ticker for a request
    fn resolve(req: &AssetReportRequest) -> Result<(Instrument, String)> {
        match req.kind {
            AssetClass::Stock => {
                let symbol = required(req.symbol.as_deref().unwrap_or_default(), "symbol")?;
                Ok((Instrument::stock(&symbol), symbol))
            }
            AssetClass::Fx => {
                let missing = || AppError::Validation("from_symbol and to_symbol required".to_string());
                let from = required(req.from_symbol.as_deref().unwrap_or_default(), "from_symbol")
                    .map_err(|_| missing())?;
                let to = required(req.to_symbol.as_deref().unwrap_or_default(), "to_symbol")
                    .map_err(|_| missing())?;
                let ticker = format!("FOREX:{}", to);
                Ok((Instrument::fx(&from, &to), ticker))
            }
            AssetClass::Crypto => {
                let symbol = required(req.symbol.as_deref().unwrap_or_default(), "symbol")?;
                let ticker = format!("CRYPTO:{}", symbol);
                Ok((Instrument::crypto(&symbol, &req.market), ticker))
            }
        }
    }
}

/// Combine market data and news into a report
pub fn build_report(market_snapshot: MarketSnapshot, news: &NewsSummary) -> AssetReport {
    let score = news.overall_average_sentiment;
    AssetReport {
        generated_at: Utc::now(),
        sentiment_mood: sentiment_mood(score).to_string(),
        sentiment_score: score,
        market_snapshot,
        notes: REPORT_NOTES.iter().map(|n| n.to_string()).collect(),
    }
}

/// Headline mood; `mixed` when no sentiment is available
pub fn sentiment_mood(score: Option<f64>) -> &'static str {
    match score {
        None => "mixed",
        Some(s) if s > MOOD_THRESHOLD => "positive",
        Some(s) if s < -MOOD_THRESHOLD => "negative",
        Some(_) => "neutral",
    }
}
