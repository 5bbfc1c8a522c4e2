//! In-process fakes shared by unit tests

use crate::config::Settings;
use crate::db::{Snapshot, SnapshotStore, SqliteSnapshotStore};
use crate::error::{AppError, Result};
use crate::providers::types::*;
use crate::providers::{MarketDataProvider, ProviderError, ProviderResult};
use crate::state::AppState;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Scriptable market data provider
#[derive(Default)]
pub struct FakeProvider {
    /// Symbols answered with an upstream error
    pub failing: Vec<String>,
    /// Symbol -> number of throttled answers before succeeding
    pub throttled: Mutex<HashMap<String, u32>>,
    pub news_fails: bool,
    pub listing: Vec<ListingRow>,
    /// Panic inside `daily_series`
    pub panics: bool,
    pub calls: AtomicUsize,
}

impl FakeProvider {
    /// Provider calls made so far, including failed ones
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self, symbol: &str) -> ProviderResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|s| s == symbol) {
            return Err(ProviderError::Upstream(format!("Invalid API call for {}", symbol)));
        }
        if let Some(left) = self.throttled.lock().get_mut(symbol) {
            if *left > 0 {
                *left -= 1;
                return Err(ProviderError::RateLimited("Note".to_string()));
            }
        }
        Ok(())
    }
}

pub fn series(closes: &[f64]) -> DailySeries {
    DailySeries {
        symbol: None,
        last_refreshed: Some("2024-05-10".to_string()),
        points: closes
            .iter()
            .enumerate()
            .map(|(i, c)| PricePoint {
                date: format!("2024-05-{:02}", 10 - i),
                close: Some(*c),
            })
            .collect(),
    }
}

#[async_trait]
impl MarketDataProvider for FakeProvider {
    async fn daily_series(
        &self,
        instrument: &Instrument,
        _output_size: OutputSize,
    ) -> ProviderResult<DailySeries> {
        if self.panics {
            panic!("daily series decoder crashed on {}", instrument.symbol);
        }
        self.check(&instrument.symbol)?;
        let mut series = series(&[110.0, 100.0, 105.0, 100.0]);
        series.symbol = Some(instrument.symbol.clone());
        Ok(series)
    }

    async fn intraday_series(
        &self,
        symbol: &str,
        interval: IntradayInterval,
        _output_size: OutputSize,
    ) -> ProviderResult<IntradaySeries> {
        self.check(symbol)?;
        let daily = series(&[101.0, 100.5]);
        Ok(IntradaySeries {
            symbol: Some(symbol.to_string()),
            interval,
            last_refreshed: Some("2024-05-10 16:00:00".to_string()),
            points: daily.points,
        })
    }

    async fn global_quote(&self, symbol: &str) -> ProviderResult<Quote> {
        self.check(symbol)?;
        Ok(Quote {
            symbol: Some(symbol.to_string()),
            price: Some(110.0),
            change: Some(10.0),
            change_percent: Some("10.0000%".to_string()),
            volume: Some(1_000.0),
            latest_trading_day: Some("2024-05-10".to_string()),
        })
    }

    async fn news_sentiment(&self, _query: &NewsQuery) -> ProviderResult<NewsFeed> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.news_fails {
            return Err(ProviderError::Upstream("news unavailable".to_string()));
        }
        Ok(NewsFeed {
            articles: vec![NewsArticle {
                title: Some("Stocks rally".to_string()),
                url: None,
                time_published: None,
                source: None,
                overall_sentiment_score: Some(0.3),
                overall_sentiment_label: Some("Somewhat-Bullish".to_string()),
                ticker_sentiment: vec![TickerSentiment {
                    ticker: "AAPL".to_string(),
                    score: Some(0.5),
                }],
            }],
        })
    }

    async fn listing_status(&self, _state: ListingState) -> ProviderResult<Vec<ListingRow>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.listing.clone())
    }
}

/// Store whose writes always fail
pub struct FailingStore;

impl SnapshotStore for FailingStore {
    fn append(&self, _snapshot: &Snapshot) -> Result<()> {
        Err(AppError::Internal("disk full".to_string()))
    }

    fn latest(&self) -> Result<Option<Snapshot>> {
        Ok(None)
    }

    fn history(&self, _limit: usize) -> Result<Vec<Snapshot>> {
        Ok(vec![])
    }
}

/// Settings with a small watchlist and fast pacing
pub fn settings(stocks: &str) -> Settings {
    let vars: Vec<(String, String)> = [
        ("MARKET_OVERVIEW_STOCKS", stocks),
        ("MARKET_OVERVIEW_CRYPTOS", ""),
        ("MARKET_OVERVIEW_FX_PAIRS", ""),
        ("MAX_CALLS_PER_MINUTE", "600"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    Settings::from_vars(&vars).unwrap()
}

/// Application state over a fake provider and an in-memory store
pub fn app_state(provider: FakeProvider, stocks: &str) -> Arc<AppState> {
    let store = Arc::new(SqliteSnapshotStore::in_memory(10).unwrap());
    Arc::new(AppState::with_parts(settings(stocks), Arc::new(provider), store).unwrap())
}
