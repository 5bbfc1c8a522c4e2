//! Service configuration
//!
//! Settings are read from the process environment after loading a `.env`
//! file (if present). Every key has a default so the service starts with an
//! empty environment; only the provider API key is needed for live data.

use crate::error::{AppError, Result};
use crate::providers::types::Instrument;
use chrono_tz::Tz;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
const DEFAULT_STOCKS: &str = "AAPL,MSFT,GOOGL,AMZN,NVDA,META,TSLA,JPM,UNH,XOM";
const DEFAULT_CRYPTOS: &str = "BTC,ETH,SOL,BNB,XRP,ADA,DOGE,AVAX";
const DEFAULT_FX_PAIRS: &str = "EUR/USD,GBP/USD,USD/JPY,USD/CHF,AUD/USD,USD/CAD";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

/// Cache lifetimes for provider responses
#[derive(Debug, Clone)]
pub struct CacheTtls {
    pub quote: Duration,
    pub intraday: Duration,
    pub daily: Duration,
    pub news: Duration,
    pub universe: Duration,
}

/// Instruments refreshed by the market overview pipeline
#[derive(Debug, Clone, Default)]
pub struct Watchlist {
    pub stocks: Vec<String>,
    pub cryptos: Vec<String>,
    pub fx_pairs: Vec<(String, String)>,
}

impl Watchlist {
    /// Build a watchlist from the comma-separated config values
    pub fn parse(stocks: &str, cryptos: &str, fx_pairs: &str) -> Self {
        Self {
            stocks: parse_csv(stocks).into_iter().map(|s| s.to_uppercase()).collect(),
            cryptos: parse_csv(cryptos).into_iter().map(|s| s.to_uppercase()).collect(),
            fx_pairs: parse_fx_pairs(fx_pairs),
        }
    }

    /// Number of instruments across all asset classes
    pub fn len(&self) -> usize {
        self.stocks.len() + self.fx_pairs.len() + self.cryptos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enumerate instruments in refresh order: stocks, FX pairs, cryptos
    pub fn enumerate(&self) -> Result<Vec<Instrument>> {
        if self.is_empty() {
            return Err(AppError::Enumeration(
                "No instruments configured for the market overview".to_string(),
            ));
        }

        let mut instruments = Vec::with_capacity(self.len());
        instruments.extend(self.stocks.iter().map(|s| Instrument::stock(s)));
        instruments.extend(self.fx_pairs.iter().map(|(from, to)| Instrument::fx(from, to)));
        instruments.extend(self.cryptos.iter().map(|s| Instrument::crypto(s, "USD")));

        Ok(instruments)
    }
}

/// Application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_keys: Vec<String>,
    pub base_url: String,
    pub cache_ttls: CacheTtls,
    pub enable_server_rate_limit: bool,
    pub max_calls_per_minute: u32,
    pub rate_limit_retries: u32,
    pub scheduler_enabled: bool,
    pub schedule_timezone: Tz,
    pub watchlist: Watchlist,
    pub db_file: PathBuf,
    pub history_limit: usize,
    pub server_host: String,
    pub server_port: u16,
    pub cors_origins: Vec<String>,
}

impl Settings {
    /// Load settings from `.env` and the process environment
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!("Failed to load .env file: {}", e);
            }
        }

        let vars: Vec<(String, String)> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Build settings from an explicit list of key/value pairs
    pub fn from_vars(vars: &[(String, String)]) -> Result<Self> {
        let get = |key: &str| -> Option<String> {
            vars.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.trim().to_string())
        };
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let cache_ttls = CacheTtls {
            quote: Duration::from_secs(parse_number(&get_or("CACHE_TTL_QUOTE", "60"), "CACHE_TTL_QUOTE")?),
            intraday: Duration::from_secs(parse_number(&get_or("CACHE_TTL_INTRADAY", "60"), "CACHE_TTL_INTRADAY")?),
            daily: Duration::from_secs(parse_number(&get_or("CACHE_TTL_DAILY", "300"), "CACHE_TTL_DAILY")?),
            news: Duration::from_secs(parse_number(&get_or("CACHE_TTL_NEWS", "300"), "CACHE_TTL_NEWS")?),
            universe: Duration::from_secs(parse_number(&get_or("CACHE_TTL_UNIVERSE", "1800"), "CACHE_TTL_UNIVERSE")?),
        };

        let timezone_name = get_or("MARKET_SCHEDULE_TIMEZONE", "UTC");
        let schedule_timezone = Tz::from_str(&timezone_name).unwrap_or_else(|_| {
            tracing::warn!("Unknown timezone '{}', falling back to UTC", timezone_name);
            Tz::UTC
        });

        let max_calls_per_minute: u32 =
            parse_number(&get_or("MAX_CALLS_PER_MINUTE", "5"), "MAX_CALLS_PER_MINUTE")?;

        Ok(Self {
            api_keys: collect_api_keys(vars),
            base_url: get_or("ALPHAVANTAGE_BASE_URL", DEFAULT_BASE_URL),
            cache_ttls,
            enable_server_rate_limit: parse_bool(
                &get_or("ENABLE_SERVER_RATE_LIMIT", "true"),
                "ENABLE_SERVER_RATE_LIMIT",
            )?,
            max_calls_per_minute: max_calls_per_minute.max(1),
            rate_limit_retries: parse_number(&get_or("RATE_LIMIT_RETRIES", "2"), "RATE_LIMIT_RETRIES")?,
            scheduler_enabled: parse_bool(
                &get_or("MARKET_SCHEDULER_ENABLED", "true"),
                "MARKET_SCHEDULER_ENABLED",
            )?,
            schedule_timezone,
            watchlist: Watchlist::parse(
                &get_or("MARKET_OVERVIEW_STOCKS", DEFAULT_STOCKS),
                &get_or("MARKET_OVERVIEW_CRYPTOS", DEFAULT_CRYPTOS),
                &get_or("MARKET_OVERVIEW_FX_PAIRS", DEFAULT_FX_PAIRS),
            ),
            db_file: PathBuf::from(get_or("MARKET_OVERVIEW_DB_FILE", "data/market_overview.db")),
            history_limit: parse_number(&get_or("SNAPSHOT_HISTORY_LIMIT", "200"), "SNAPSHOT_HISTORY_LIMIT")?,
            server_host: get_or("SERVER_HOST", "127.0.0.1"),
            server_port: parse_number(&get_or("SERVER_PORT", "8000"), "SERVER_PORT")?,
            cors_origins: parse_csv(&get_or("CORS_ORIGINS", DEFAULT_CORS_ORIGINS)),
        })
    }

    /// Minimum spacing between provider calls derived from the per-minute budget
    pub fn call_spacing(&self) -> Duration {
        let secs = 60.0 / f64::from(self.max_calls_per_minute.max(1));
        Duration::from_secs_f64(secs.max(0.05))
    }
}

fn parse_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

fn parse_fx_pairs(value: &str) -> Vec<(String, String)> {
    parse_csv(value)
        .into_iter()
        .filter_map(|pair| {
            let (from, to) = pair.split_once('/')?;
            let (from, to) = (from.trim(), to.trim());
            if from.is_empty() || to.is_empty() {
                return None;
            }
            Some((from.to_uppercase(), to.to_uppercase()))
        })
        .collect()
}

/// Gather API keys from the list, single and numbered variables, deduplicated in order
fn collect_api_keys(vars: &[(String, String)]) -> Vec<String> {
    let mut keys = Vec::new();

    for (name, value) in vars {
        if name == "ALPHAVANTAGE_API_KEYS" {
            keys.extend(parse_csv(value));
        }
    }
    for (name, value) in vars {
        if name == "ALPHAVANTAGE_API_KEY" && !value.trim().is_empty() {
            keys.push(value.trim().to_string());
        }
    }

    let mut numbered: Vec<(u64, &str)> = vars
        .iter()
        .filter_map(|(name, value)| {
            let suffix = name.strip_prefix("ALPHAVANTAGE_API_KEY_")?;
            Some((suffix.parse::<u64>().unwrap_or(u64::MAX), value.trim()))
        })
        .collect();
    numbered.sort_by_key(|(idx, _)| *idx);
    keys.extend(
        numbered
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(_, v)| v.to_string()),
    );

    let mut seen = std::collections::HashSet::new();
    keys.retain(|k| seen.insert(k.clone()));
    keys
}

fn parse_number<T: FromStr>(value: &str, key: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| AppError::Config(format!("{} must be a non-negative integer, got '{}'", key, value)))
}

fn parse_bool(value: &str, key: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::Config(format!("{} must be a boolean, got '{}'", key, value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_vars(&[]).unwrap();
        assert_eq!(settings.max_calls_per_minute, 5);
        assert_eq!(settings.call_spacing(), Duration::from_secs(12));
        assert_eq!(settings.watchlist.stocks.len(), 10);
        assert_eq!(settings.watchlist.fx_pairs.len(), 6);
        assert_eq!(settings.watchlist.cryptos.len(), 8);
        assert_eq!(settings.history_limit, 200);
        assert_eq!(settings.schedule_timezone, Tz::UTC);
        assert!(settings.api_keys.is_empty());
    }

    #[test]
    fn test_api_keys_order_and_dedup() {
        let settings = Settings::from_vars(&vars(&[
            ("ALPHAVANTAGE_API_KEY_2", "k3"),
            ("ALPHAVANTAGE_API_KEYS", "k1, k2"),
            ("ALPHAVANTAGE_API_KEY", "k2"),
            ("ALPHAVANTAGE_API_KEY_1", "k4"),
        ]))
        .unwrap();
        assert_eq!(settings.api_keys, vec!["k1", "k2", "k4", "k3"]);
    }

    #[test]
    fn test_fx_pairs_skip_malformed() {
        let watchlist = Watchlist::parse("aapl", "", "eur/usd, GBPUSD, /JPY, usd/chf");
        assert_eq!(watchlist.stocks, vec!["AAPL"]);
        assert_eq!(
            watchlist.fx_pairs,
            vec![
                ("EUR".to_string(), "USD".to_string()),
                ("USD".to_string(), "CHF".to_string())
            ]
        );
    }

    #[test]
    fn test_enumerate_order_and_empty() {
        let watchlist = Watchlist::parse("AAPL,MSFT", "BTC", "EUR/USD");
        let instruments = watchlist.enumerate().unwrap();
        let symbols: Vec<_> = instruments.iter().map(|i| i.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT", "EUR/USD", "BTC"]);

        let empty = Watchlist::parse("", "", "");
        assert!(matches!(empty.enumerate(), Err(AppError::Enumeration(_))));
    }

    #[test]
    fn test_invalid_values() {
        assert!(Settings::from_vars(&vars(&[("SERVER_PORT", "eighty")])).is_err());
        assert!(Settings::from_vars(&vars(&[("ENABLE_SERVER_RATE_LIMIT", "maybe")])).is_err());

        let settings =
            Settings::from_vars(&vars(&[("MARKET_SCHEDULE_TIMEZONE", "Mars/Olympus")])).unwrap();
        assert_eq!(settings.schedule_timezone, Tz::UTC);
    }

    #[test]
    fn test_call_spacing_floor() {
        let settings = Settings::from_vars(&vars(&[("MAX_CALLS_PER_MINUTE", "6000")])).unwrap();
        assert_eq!(settings.call_spacing(), Duration::from_secs_f64(0.05));
    }
}
