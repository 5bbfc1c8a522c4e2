//! Market Service
//!
//! Pass-through market data operations: quotes, daily and intraday series,
//! the tradable universe listing and news sentiment. Calls share the refresh
//! pipeline's pacer when server-side rate limiting is enabled.

use crate::analytics::{aggregate_news_sentiment, summarize_series, NewsSummary};
use crate::error::{AppError, Result};
use crate::providers::types::{
    AssetClass, Instrument, IntradayInterval, IntradaySeries, ListingRow, ListingState, NewsQuery,
    OutputSize, PricePoint, Quote,
};
use crate::providers::ProviderError;
use crate::state::AppState;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Refresh cadence advertised with the universe listing
const UNIVERSE_REFRESH_MINUTES: u32 = 30;
/// Upper bound for the news `limit` parameter
pub const MAX_NEWS_LIMIT: u32 = 1000;

/// Summarised daily series for one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesReport {
    pub asset_class: AssetClass,
    pub symbol: String,
    pub last_refreshed: Option<String>,
    pub latest_close: Option<f64>,
    pub momentum_1d: Option<f64>,
    pub volatility_proxy: Option<f64>,
    pub points: Vec<PricePoint>,
}

/// Tradable universe listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseSnapshot {
    pub state: ListingState,
    pub count: usize,
    pub updated_every_minutes: u32,
    pub tickers: Vec<ListingRow>,
}

/// Market service for business logic
pub struct MarketService;

impl MarketService {
    /// Latest quote for a stock symbol
    pub async fn quote(state: &AppState, symbol: &str) -> Result<Quote> {
        let symbol = required(symbol, "symbol")?;
        info!("MarketService::quote - {}", symbol);

        state.pace_pass_through().await;
        Ok(state.provider.global_quote(&symbol).await?)
    }

    /// Daily series summary for a stock, FX pair or crypto asset
    pub async fn daily(
        state: &AppState,
        instrument: &Instrument,
        output_size: OutputSize,
    ) -> Result<SeriesReport> {
        if instrument.base.is_empty() {
            return Err(AppError::Validation("symbol required".to_string()));
        }
        info!(
            "MarketService::daily - {} {}",
            instrument.asset_class, instrument.symbol
        );

        state.pace_pass_through().await;
        let series = state.provider.daily_series(instrument, output_size).await?;
        let summary = summarize_series(&series);

        Ok(SeriesReport {
            asset_class: instrument.asset_class,
            symbol: instrument.symbol.clone(),
            last_refreshed: series.last_refreshed,
            latest_close: summary.latest_close,
            momentum_1d: summary.momentum_1d,
            volatility_proxy: summary.volatility_proxy,
            points: series.points,
        })
    }

    /// Intraday bars for a stock symbol, passed through unsummarised
    pub async fn intraday(
        state: &AppState,
        symbol: &str,
        interval: IntradayInterval,
        output_size: OutputSize,
    ) -> Result<IntradaySeries> {
        let symbol = required(symbol, "symbol")?;
        info!("MarketService::intraday - {} {}", symbol, interval.as_str());

        state.pace_pass_through().await;
        Ok(state
            .provider
            .intraday_series(&symbol, interval, output_size)
            .await?)
    }

    /// Active or delisted tickers
    pub async fn universe(state: &AppState, listing: ListingState) -> Result<UniverseSnapshot> {
        info!("MarketService::universe - {}", listing.as_str());

        state.pace_pass_through().await;
        let tickers = state.provider.listing_status(listing).await?;
        if tickers.is_empty() {
            return Err(ProviderError::Upstream(
                "Empty universe snapshot response from Alpha Vantage".to_string(),
            )
            .into());
        }

        Ok(UniverseSnapshot {
            state: listing,
            count: tickers.len(),
            updated_every_minutes: UNIVERSE_REFRESH_MINUTES,
            tickers,
        })
    }

    /// Aggregated news sentiment
    pub async fn news_sentiment(state: &AppState, query: &NewsQuery) -> Result<NewsSummary> {
        if !(1..=MAX_NEWS_LIMIT).contains(&query.limit) {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {}, got {}",
                MAX_NEWS_LIMIT, query.limit
            )));
        }
        info!(
            "MarketService::news_sentiment - tickers={:?} topics={:?}",
            query.tickers, query.topics
        );

        state.pace_pass_through().await;
        let feed = state.provider.news_sentiment(query).await?;
        Ok(aggregate_news_sentiment(&feed))
    }
}

/// Trimmed, upper-cased required parameter
pub(crate) fn required(value: &str, name: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{} required", name)));
    }
    Ok(value.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{app_state, FakeProvider};

    #[tokio::test]
    async fn test_quote_requires_symbol() {
        let state = app_state(FakeProvider::default(), "AAPL");
        assert!(matches!(
            MarketService::quote(&state, "  ").await,
            Err(AppError::Validation(_))
        ));

        let quote = MarketService::quote(&state, "aapl").await.unwrap();
        assert_eq!(quote.symbol.as_deref(), Some("AAPL"));
    }

    #[tokio::test]
    async fn test_daily_summary() {
        let state = app_state(FakeProvider::default(), "AAPL");
        let report = MarketService::daily(&state, &Instrument::fx("eur", "usd"), OutputSize::Compact)
            .await
            .unwrap();

        assert_eq!(report.symbol, "EUR/USD");
        assert_eq!(report.latest_close, Some(110.0));
        assert!((report.momentum_1d.unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(report.points.len(), 4);
    }

    #[tokio::test]
    async fn test_intraday_series() {
        let state = app_state(FakeProvider::default(), "AAPL");
        let series = MarketService::intraday(
            &state,
            " ibm ",
            IntradayInterval::FifteenMinutes,
            OutputSize::Compact,
        )
        .await
        .unwrap();
        assert_eq!(series.symbol.as_deref(), Some("IBM"));
        assert_eq!(series.interval, IntradayInterval::FifteenMinutes);
        assert_eq!(series.points.len(), 2);

        assert!(matches!(
            MarketService::intraday(&state, "", IntradayInterval::default(), OutputSize::Compact).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_provider_error_maps_to_bad_gateway_kind() {
        let provider = FakeProvider {
            failing: vec!["BAD".to_string()],
            ..FakeProvider::default()
        };
        let state = app_state(provider, "AAPL");
        let err = MarketService::quote(&state, "bad").await.unwrap_err();
        assert!(matches!(err, AppError::Provider(ProviderError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_empty_universe_is_provider_error() {
        let state = app_state(FakeProvider::default(), "AAPL");
        let err = MarketService::universe(&state, ListingState::Active)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Provider(_)));
    }

    #[tokio::test]
    async fn test_universe_listing() {
        let provider = FakeProvider {
            listing: vec![ListingRow {
                symbol: "AAPL".to_string(),
                name: Some("Apple Inc".to_string()),
                exchange: Some("NASDAQ".to_string()),
                asset_type: Some("Stock".to_string()),
                ipo_date: None,
                delisting_date: None,
                status: Some("Active".to_string()),
            }],
            ..FakeProvider::default()
        };
        let state = app_state(provider, "AAPL");
        let universe = MarketService::universe(&state, ListingState::Active)
            .await
            .unwrap();
        assert_eq!(universe.count, 1);
        assert_eq!(universe.updated_every_minutes, 30);
    }

    #[tokio::test]
    async fn test_news_limit_bounds() {
        let state = app_state(FakeProvider::default(), "AAPL");
        let query = NewsQuery {
            limit: 0,
            ..NewsQuery::default()
        };
        assert!(matches!(
            MarketService::news_sentiment(&state, &query).await,
            Err(AppError::Validation(_))
        ));

        let summary = MarketService::news_sentiment(&state, &NewsQuery::default())
            .await
            .unwrap();
        assert_eq!(summary.overall_average_sentiment, Some(0.3));
    }
}
