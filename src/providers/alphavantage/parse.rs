//! Alpha Vantage payload decoding
//!
//! Alpha Vantage returns numbers as strings and keys prefixed with ordinals
//! ("4. close"), and signals throttling and errors in-band with a 200 status.

use crate::providers::types::*;
use crate::providers::{ProviderError, ProviderResult};
use serde_json::{Map, Value};

/// Maximum number of points kept per series
const MAX_POINTS: usize = 120;

/// Maximum number of articles kept from a news feed
const MAX_ARTICLES: usize = 1000;

/// In-band payload classification
#[derive(Debug, PartialEq)]
pub enum PayloadStatus {
    Ok,
    Throttled(String),
    Error(String),
}

/// Classify a JSON payload as data, throttle notice or error
pub fn classify_payload(data: &Value) -> PayloadStatus {
    let Some(obj) = data.as_object() else {
        return PayloadStatus::Ok;
    };

    if let Some(note) = obj.get("Note").and_then(Value::as_str) {
        return PayloadStatus::Throttled(note.to_string());
    }
    if let Some(info) = obj.get("Information") {
        let text = value_to_string(info);
        let lower = text.to_lowercase();
        if lower.contains("rate limit") || lower.contains("call frequency") || lower.contains("requests per") {
            return PayloadStatus::Throttled(text);
        }
        return PayloadStatus::Error(text);
    }
    if let Some(message) = obj.get("Error Message") {
        return PayloadStatus::Error(value_to_string(message));
    }
    PayloadStatus::Ok
}

/// Convert an in-band status to a provider result
pub fn check_payload(data: Value) -> ProviderResult<Value> {
    match classify_payload(&data) {
        PayloadStatus::Ok => Ok(data),
        PayloadStatus::Throttled(msg) => Err(ProviderError::RateLimited(msg)),
        PayloadStatus::Error(msg) => Err(ProviderError::Upstream(msg)),
    }
}

/// Decode a daily series for any asset class
pub fn parse_daily_series(asset_class: AssetClass, data: &Value) -> ProviderResult<DailySeries> {
    let obj = data
        .as_object()
        .ok_or_else(|| ProviderError::Decode("daily series payload is not an object".to_string()))?;
    let meta = obj.get("Meta Data").and_then(Value::as_object);

    let (symbol, last_refreshed, series) = match asset_class {
        AssetClass::Stock => (
            meta_str(meta, "2. Symbol"),
            meta_str(meta, "3. Last Refreshed"),
            obj.get("Time Series (Daily)"),
        ),
        AssetClass::Fx => (
            match (meta_str(meta, "2. From Symbol"), meta_str(meta, "3. To Symbol")) {
                (Some(from), Some(to)) => Some(format!("{}/{}", from, to)),
                _ => None,
            },
            meta_str(meta, "5. Last Refreshed"),
            obj.get("Time Series FX (Daily)"),
        ),
        AssetClass::Crypto => (
            meta_str(meta, "2. Digital Currency Code"),
            meta_str(meta, "6. Last Refreshed").or_else(|| meta_str(meta, "5. Last Refreshed")),
            obj.iter()
                .find(|(key, _)| key.starts_with("Time Series"))
                .map(|(_, value)| value),
        ),
    };

    let series = series
        .and_then(Value::as_object)
        .ok_or_else(|| ProviderError::Decode(format!("no {} time series in payload", asset_class)))?;

    Ok(DailySeries {
        symbol,
        last_refreshed,
        points: newest_points(series, |row| close_of(asset_class, row)),
    })
}

/// Decode a `TIME_SERIES_INTRADAY` payload
pub fn parse_intraday_series(interval: IntradayInterval, data: &Value) -> ProviderResult<IntradaySeries> {
    let meta = data.get("Meta Data").and_then(Value::as_object);
    let series_key = format!("Time Series ({})", interval.as_str());
    let series = data
        .get(&series_key)
        .and_then(Value::as_object)
        .ok_or_else(|| ProviderError::Decode(format!("no '{}' in payload", series_key)))?;

    Ok(IntradaySeries {
        symbol: meta_str(meta, "2. Symbol"),
        interval,
        last_refreshed: meta_str(meta, "3. Last Refreshed"),
        points: newest_points(series, |row| row.get("4. close").and_then(to_f64)),
    })
}

/// Points sorted newest first and capped
fn newest_points<F>(series: &Map<String, Value>, close: F) -> Vec<PricePoint>
where
    F: Fn(&Value) -> Option<f64>,
{
    let mut points: Vec<PricePoint> = series
        .iter()
        .map(|(date, row)| PricePoint {
            date: date.clone(),
            close: close(row),
        })
        .collect();

    points.sort_by(|a, b| b.date.cmp(&a.date));
    points.truncate(MAX_POINTS);
    points
}

fn close_of(asset_class: AssetClass, row: &Value) -> Option<f64> {
    let keys: &[&str] = match asset_class {
        AssetClass::Crypto => &["4a. close (USD)", "4b. close (USD)", "4. close"],
        _ => &["4. close"],
    };
    keys.iter().find_map(|key| row.get(*key).and_then(to_f64))
}

/// Decode a `GLOBAL_QUOTE` payload
pub fn parse_quote(data: &Value) -> ProviderResult<Quote> {
    let quote = data
        .get("Global Quote")
        .and_then(Value::as_object)
        .ok_or_else(|| ProviderError::Decode("no Global Quote in payload".to_string()))?;
    let q = Some(quote);

    Ok(Quote {
        symbol: meta_str(q, "01. symbol"),
        price: quote.get("05. price").and_then(to_f64),
        change: quote.get("09. change").and_then(to_f64),
        change_percent: meta_str(q, "10. change percent"),
        volume: quote.get("06. volume").and_then(to_f64),
        latest_trading_day: meta_str(q, "07. latest trading day"),
    })
}

/// Decode a `NEWS_SENTIMENT` payload
pub fn parse_news_feed(data: &Value) -> ProviderResult<NewsFeed> {
    let feed = match data.get("feed") {
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ProviderError::Decode("news feed is not an array".to_string())),
        None => return Ok(NewsFeed::default()),
    };

    let articles = feed
        .iter()
        .take(MAX_ARTICLES)
        .filter_map(Value::as_object)
        .map(|item| {
            let item = Some(item);
            let ticker_sentiment = item
                .and_then(|i| i.get("ticker_sentiment"))
                .and_then(Value::as_array)
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(|entry| {
                            let ticker = entry.get("ticker").and_then(Value::as_str)?;
                            Some(TickerSentiment {
                                ticker: ticker.to_string(),
                                score: entry.get("ticker_sentiment_score").and_then(to_f64),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();

            NewsArticle {
                title: meta_str(item, "title"),
                url: meta_str(item, "url"),
                time_published: meta_str(item, "time_published"),
                source: meta_str(item, "source"),
                overall_sentiment_score: item
                    .and_then(|i| i.get("overall_sentiment_score"))
                    .and_then(to_f64),
                overall_sentiment_label: meta_str(item, "overall_sentiment_label"),
                ticker_sentiment,
            }
        })
        .collect();

    Ok(NewsFeed { articles })
}

/// Decode the `LISTING_STATUS` CSV body
pub fn parse_listing_csv(text: &str) -> ProviderResult<Vec<ListingRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    reader
        .deserialize::<ListingRow>()
        .map(|row| row.map_err(|e| ProviderError::Decode(format!("listing CSV: {}", e))))
        .collect()
}

/// True when a CSV endpoint answered with a JSON throttle notice
pub fn is_csv_throttle(text: &str) -> bool {
    text.trim_start().starts_with('{') && text.contains("\"Note\"")
}

fn meta_str(obj: Option<&Map<String, Value>>, key: &str) -> Option<String> {
    obj.and_then(|o| o.get(key)).and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}
