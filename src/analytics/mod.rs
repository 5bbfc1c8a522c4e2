//! Pure analytics over provider data
//!
//! - `series`: momentum and volatility of a daily close history
//! - `news`: overall and per-ticker sentiment aggregation
//! - `guidance`: heuristic signals and market guidance

pub mod guidance;
pub mod news;
pub mod series;

pub use guidance::{build_market_guidance, score_row, MarketGuidance, MarketRow, Signal, SignalRow};
pub use news::{aggregate_news_sentiment, NewsItem, NewsSummary, TickerScore};
pub use series::{summarize_series, SeriesSummary};
