//! Alpha Vantage market data adapter

mod parse;

use crate::config::Settings;
use crate::providers::cache::TtlCache;
use crate::providers::types::*;
use crate::providers::{MarketDataProvider, ProviderError, ProviderResult};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

const JSON_TIMEOUT: Duration = Duration::from_secs(30);
const CSV_TIMEOUT: Duration = Duration::from_secs(60);

/// Transport retry policy: attempts and exponential backoff bounds
const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_MULTIPLIER: f64 = 0.6;
const BACKOFF_MIN: f64 = 0.5;
const BACKOFF_MAX: f64 = 6.0;

/// Alpha Vantage provider implementation
pub struct AlphaVantageProvider {
    client: Client,
    base_url: String,
    api_keys: Vec<String>,
    next_key: AtomicUsize,
    quote_cache: TtlCache<String, Quote>,
    series_cache: TtlCache<(AssetClass, String, OutputSize), DailySeries>,
    intraday_cache: TtlCache<(String, IntradayInterval, OutputSize), IntradaySeries>,
    news_cache: TtlCache<NewsQuery, NewsFeed>,
    universe_cache: TtlCache<ListingState, Vec<ListingRow>>,
}

impl AlphaVantageProvider {
    pub fn new(settings: &Settings) -> ProviderResult<Self> {
        let client = Client::builder().timeout(JSON_TIMEOUT).build()?;
        let ttls = &settings.cache_ttls;

        if settings.api_keys.is_empty() {
            warn!("No Alpha Vantage API keys configured; provider calls will fail");
        }

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            api_keys: settings.api_keys.clone(),
            next_key: AtomicUsize::new(0),
            quote_cache: TtlCache::new(512, ttls.quote),
            series_cache: TtlCache::new(256, ttls.daily),
            intraday_cache: TtlCache::new(128, ttls.intraday),
            news_cache: TtlCache::new(256, ttls.news),
            universe_cache: TtlCache::new(8, ttls.universe),
        })
    }

    /// Round-robin over configured keys
    fn take_next_key(&self) -> ProviderResult<&str> {
        if self.api_keys.is_empty() {
            return Err(ProviderError::NoApiKeys);
        }
        let idx = self.next_key.fetch_add(1, Ordering::Relaxed) % self.api_keys.len();
        Ok(&self.api_keys[idx])
    }

    /// Request a JSON payload, rotating keys when a key is throttled
    ///
    /// The caller reserves one pacer slot per logical call, but a throttle
    /// notice moves on to the next key within that slot. One slot can
    /// therefore cost up to `api_keys.len()` HTTP requests, each against a
    /// different key's budget.
    async fn get_json(&self, params: &[(&str, String)]) -> ProviderResult<Value> {
        with_backoff(|| async move {
            let attempts = self.api_keys.len().max(1);
            let mut last_notice = String::from("all API keys throttled");

            for _ in 0..attempts {
                let key = self.take_next_key()?;
                let data: Value = self
                    .client
                    .get(&self.base_url)
                    .query(params)
                    .query(&[("apikey", key)])
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;

                match parse::classify_payload(&data) {
                    parse::PayloadStatus::Throttled(notice) => {
                        debug!("Alpha Vantage key throttled, rotating: {}", notice);
                        last_notice = notice;
                        continue;
                    }
                    _ => return parse::check_payload(data),
                }
            }

            Err(ProviderError::RateLimited(last_notice))
        })
        .await
    }

    /// Request a CSV payload, rotating keys when a key is throttled
    async fn get_csv(&self, params: &[(&str, String)]) -> ProviderResult<Vec<ListingRow>> {
        with_backoff(|| async move {
            let attempts = self.api_keys.len().max(1);

            for _ in 0..attempts {
                let key = self.take_next_key()?;
                let text = self
                    .client
                    .get(&self.base_url)
                    .timeout(CSV_TIMEOUT)
                    .query(params)
                    .query(&[("datatype", "csv"), ("apikey", key)])
                    .send()
                    .await?
                    .error_for_status()?
                    .text()
                    .await?;

                if parse::is_csv_throttle(&text) {
                    continue;
                }
                let rows = parse::parse_listing_csv(&text)?;
                if !rows.is_empty() {
                    return Ok(rows);
                }
            }

            Err(ProviderError::RateLimited(
                "empty or throttled universe listing response".to_string(),
            ))
        })
        .await
    }
}

/// Retry transport failures with exponential backoff; provider answers are not retried
async fn with_backoff<T, F, Fut>(mut op: F) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ProviderResult<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Err(ProviderError::Http(e)) if attempt < MAX_ATTEMPTS => {
                let delay = backoff_delay(attempt);
                warn!(
                    "Alpha Vantage request failed (attempt {}/{}), retrying in {:?}: {}",
                    attempt, MAX_ATTEMPTS, delay, e
                );
                tokio::time::sleep(delay).await;
            }
            other => return other,
        }
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let secs = BACKOFF_MULTIPLIER * 2f64.powi(attempt as i32);
    Duration::from_secs_f64(secs.clamp(BACKOFF_MIN, BACKOFF_MAX))
}

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
    async fn daily_series(
        &self,
        instrument: &Instrument,
        output_size: OutputSize,
    ) -> ProviderResult<DailySeries> {
        let cache_key = (instrument.asset_class, instrument.symbol.clone(), output_size);
        if let Some(series) = self.series_cache.get(&cache_key) {
            return Ok(series);
        }

        let market = instrument.quote.clone().unwrap_or_else(|| "USD".to_string());
        let params: Vec<(&str, String)> = match instrument.asset_class {
            AssetClass::Stock => vec![
                ("function", "TIME_SERIES_DAILY".to_string()),
                ("symbol", instrument.base.clone()),
                ("outputsize", output_size.as_str().to_string()),
            ],
            AssetClass::Fx => vec![
                ("function", "FX_DAILY".to_string()),
                ("from_symbol", instrument.base.clone()),
                ("to_symbol", market),
                ("outputsize", output_size.as_str().to_string()),
            ],
            AssetClass::Crypto => vec![
                ("function", "DIGITAL_CURRENCY_DAILY".to_string()),
                ("symbol", instrument.base.clone()),
                ("market", market),
            ],
        };

        let data = self.get_json(&params).await?;
        let series = parse::parse_daily_series(instrument.asset_class, &data)?;
        self.series_cache.insert(cache_key, series.clone());
        Ok(series)
    }

    async fn intraday_series(
        &self,
        symbol: &str,
        interval: IntradayInterval,
        output_size: OutputSize,
    ) -> ProviderResult<IntradaySeries> {
        let symbol = symbol.trim().to_uppercase();
        let cache_key = (symbol.clone(), interval, output_size);
        if let Some(series) = self.intraday_cache.get(&cache_key) {
            return Ok(series);
        }

        let data = self
            .get_json(&[
                ("function", "TIME_SERIES_INTRADAY".to_string()),
                ("symbol", symbol),
                ("interval", interval.as_str().to_string()),
                ("outputsize", output_size.as_str().to_string()),
            ])
            .await?;
        let series = parse::parse_intraday_series(interval, &data)?;
        self.intraday_cache.insert(cache_key, series.clone());
        Ok(series)
    }

    async fn global_quote(&self, symbol: &str) -> ProviderResult<Quote> {
        let symbol = symbol.trim().to_uppercase();
        if let Some(quote) = self.quote_cache.get(&symbol) {
            return Ok(quote);
        }

        let data = self
            .get_json(&[
                ("function", "GLOBAL_QUOTE".to_string()),
                ("symbol", symbol.clone()),
            ])
            .await?;
        let quote = parse::parse_quote(&data)?;
        self.quote_cache.insert(symbol, quote.clone());
        Ok(quote)
    }

    async fn news_sentiment(&self, query: &NewsQuery) -> ProviderResult<NewsFeed> {
        if let Some(feed) = self.news_cache.get(query) {
            return Ok(feed);
        }

        let mut params = vec![
            ("function", "NEWS_SENTIMENT".to_string()),
            ("sort", query.sort.clone()),
            ("limit", query.limit.to_string()),
        ];
        let optional = [
            ("tickers", &query.tickers),
            ("topics", &query.topics),
            ("time_from", &query.time_from),
            ("time_to", &query.time_to),
        ];
        for (name, value) in optional {
            if let Some(value) = value.as_ref().filter(|v| !v.is_empty()) {
                params.push((name, value.clone()));
            }
        }

        let data = self.get_json(&params).await?;
        let feed = parse::parse_news_feed(&data)?;
        self.news_cache.insert(query.clone(), feed.clone());
        Ok(feed)
    }

    async fn listing_status(&self, state: ListingState) -> ProviderResult<Vec<ListingRow>> {
        if let Some(rows) = self.universe_cache.get(&state) {
            return Ok(rows);
        }

        let rows = self
            .get_csv(&[
                ("function", "LISTING_STATUS".to_string()),
                ("state", state.as_str().to_string()),
            ])
            .await?;
        self.universe_cache.insert(state, rows.clone());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_keys(keys: &str) -> Settings {
        Settings::from_vars(&[("ALPHAVANTAGE_API_KEYS".to_string(), keys.to_string())]).unwrap()
    }

    #[test]
    fn test_key_rotation() {
        let provider = AlphaVantageProvider::new(&settings_with_keys("a,b,c")).unwrap();
        let keys: Vec<String> = (0..4)
            .map(|_| provider.take_next_key().unwrap().to_string())
            .collect();
        assert_eq!(keys, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_no_keys() {
        let provider = AlphaVantageProvider::new(&Settings::from_vars(&[]).unwrap()).unwrap();
        assert!(matches!(provider.take_next_key(), Err(ProviderError::NoApiKeys)));
    }

    #[test]
    fn test_backoff_bounds() {
        assert_eq!(backoff_delay(1), Duration::from_secs_f64(1.2));
        assert_eq!(backoff_delay(2), Duration::from_secs_f64(2.4));
        assert_eq!(backoff_delay(10), Duration::from_secs_f64(6.0));
    }

    #[tokio::test]
    async fn test_no_keys_fails_without_network() {
        let provider = AlphaVantageProvider::new(&Settings::from_vars(&[]).unwrap()).unwrap();
        let err = provider.global_quote("AAPL").await.unwrap_err();
        assert!(matches!(err, ProviderError::NoApiKeys));
    }
}
