//! Heuristic buy/sell/hold signals and market guidance
//!
//! Signal rankings are educational heuristics, not financial advice.

use crate::analytics::news::NewsSummary;
use crate::providers::types::AssetClass;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const MOMENTUM_WEIGHT: f64 = 0.5;
const SENTIMENT_WEIGHT: f64 = 0.35;
const VOLATILITY_WEIGHT: f64 = 0.25;
const SIGNAL_THRESHOLD: f64 = 0.22;
const MOOD_THRESHOLD: f64 = 0.15;
const DIRECTION_THRESHOLD: f64 = 0.2;
const CANDIDATES: usize = 10;

pub const DISCLAIMER: &str =
    "Signal rankings are heuristic and educational, not financial advice.";

/// Categorical signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    pub fn from_score(score: f64) -> Self {
        if score >= SIGNAL_THRESHOLD {
            Signal::Buy
        } else if score <= -SIGNAL_THRESHOLD {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

/// One refreshed instrument before scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRow {
    pub asset_class: AssetClass,
    pub symbol: String,
    pub price: Option<f64>,
    pub momentum_1d: Option<f64>,
    pub volatility_proxy: Option<f64>,
    pub sentiment: Option<f64>,
    pub last_refreshed: Option<String>,
}

/// One instrument's computed signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    #[serde(flatten)]
    pub row: MarketRow,
    pub signal_score: f64,
    pub signal: Signal,
    pub risk_score: f64,
}

/// Market-wide guidance derived from all signal rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketGuidance {
    pub public_mood: String,
    pub expected_market_direction: String,
    pub signals: Vec<SignalRow>,
    pub safest_bets: Vec<SignalRow>,
    pub riskiest_bets: Vec<SignalRow>,
    pub buy_candidates: Vec<SignalRow>,
    pub sell_candidates: Vec<SignalRow>,
    pub hold_candidates: Vec<SignalRow>,
    pub disclaimer: String,
}

/// Score a single row
pub fn score_row(row: &MarketRow) -> SignalRow {
    let momentum = bounded(row.momentum_1d, -1.0, 1.0);
    let volatility = bounded(row.volatility_proxy, 0.0, 1.0);
    let sentiment = bounded(row.sentiment, -1.0, 1.0);
    let score =
        MOMENTUM_WEIGHT * momentum + SENTIMENT_WEIGHT * sentiment - VOLATILITY_WEIGHT * volatility;

    SignalRow {
        row: row.clone(),
        signal_score: round4(score),
        signal: Signal::from_score(score),
        risk_score: round4(volatility),
    }
}

/// Build guidance for all refreshed rows
pub fn build_market_guidance(rows: &[MarketRow], news: &NewsSummary) -> MarketGuidance {
    let news_avg = news.overall_average_sentiment;
    let signals: Vec<SignalRow> = rows.iter().map(score_row).collect();

    let mut safest = signals.clone();
    safest.sort_by(|a, b| {
        a.risk_score
            .total_cmp(&b.risk_score)
            .then(b.signal_score.total_cmp(&a.signal_score))
    });

    let mut riskiest = signals.clone();
    riskiest.sort_by(|a, b| {
        b.risk_score.total_cmp(&a.risk_score).then(
            abs_momentum(b)
                .partial_cmp(&abs_momentum(a))
                .unwrap_or(Ordering::Equal),
        )
    });

    let mut by_score = signals.clone();
    by_score.sort_by(|a, b| b.signal_score.total_cmp(&a.signal_score));
    let buys = pick(by_score.iter(), Signal::Buy);
    let sells = pick(by_score.iter().rev(), Signal::Sell);

    let mut by_magnitude = signals.clone();
    by_magnitude.sort_by(|a, b| a.signal_score.abs().total_cmp(&b.signal_score.abs()));
    let holds = pick(by_magnitude.iter(), Signal::Hold);

    MarketGuidance {
        public_mood: public_mood(news_avg).to_string(),
        expected_market_direction: expected_direction(news_avg).to_string(),
        signals,
        safest_bets: truncate(safest),
        riskiest_bets: truncate(riskiest),
        buy_candidates: buys,
        sell_candidates: sells,
        hold_candidates: holds,
        disclaimer: DISCLAIMER.to_string(),
    }
}

/// Mood label from the overall news sentiment
pub fn public_mood(news_avg: Option<f64>) -> &'static str {
    match news_avg {
        Some(avg) if avg > MOOD_THRESHOLD => "bullish",
        Some(avg) if avg < -MOOD_THRESHOLD => "bearish",
        _ => "neutral",
    }
}

fn expected_direction(news_avg: Option<f64>) -> &'static str {
    match news_avg {
        Some(avg) if avg > DIRECTION_THRESHOLD => "upside bias",
        Some(avg) if avg < -DIRECTION_THRESHOLD => "downside bias",
        _ => "range-bound",
    }
}

fn pick<'a>(rows: impl Iterator<Item = &'a SignalRow>, signal: Signal) -> Vec<SignalRow> {
    rows.filter(|r| r.signal == signal)
        .take(CANDIDATES)
        .cloned()
        .collect()
}

fn truncate(mut rows: Vec<SignalRow>) -> Vec<SignalRow> {
    rows.truncate(CANDIDATES);
    rows
}

fn abs_momentum(row: &SignalRow) -> f64 {
    row.row.momentum_1d.unwrap_or(0.0).abs()
}

fn bounded(value: Option<f64>, lo: f64, hi: f64) -> f64 {
    value.map(|v| v.clamp(lo, hi)).unwrap_or(0.0)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(symbol: &str, momentum: f64, volatility: Option<f64>, sentiment: Option<f64>) -> MarketRow {
        MarketRow {
            asset_class: AssetClass::Stock,
            symbol: symbol.to_string(),
            price: Some(100.0),
            momentum_1d: Some(momentum),
            volatility_proxy: volatility,
            sentiment,
            last_refreshed: None,
        }
    }

    #[test]
    fn test_signal_thresholds() {
        assert_eq!(Signal::from_score(0.22), Signal::Buy);
        assert_eq!(Signal::from_score(-0.22), Signal::Sell);
        assert_eq!(Signal::from_score(0.1), Signal::Hold);
    }

    #[test]
    fn test_score_row_weights_and_bounds() {
        // momentum is clamped to 1.0
        let scored = score_row(&row("UP", 3.0, Some(0.2), Some(0.0)));
        assert_eq!(scored.signal_score, 0.45);
        assert_eq!(scored.signal, Signal::Buy);
        assert_eq!(scored.risk_score, 0.2);

        let scored = score_row(&row("FLAT", 0.0, None, None));
        assert_eq!(scored.signal_score, 0.0);
        assert_eq!(scored.signal, Signal::Hold);
    }

    #[test]
    fn test_guidance_candidates() {
        let rows = vec![
            row("BUY", 0.6, Some(0.0), Some(0.0)),
            row("SELL", -0.6, Some(0.0), Some(0.0)),
            row("HOLD", 0.01, Some(0.5), None),
        ];
        let news = NewsSummary {
            overall_average_sentiment: Some(0.3),
            ..NewsSummary::default()
        };

        let guidance = build_market_guidance(&rows, &news);
        assert_eq!(guidance.signals.len(), 3);
        assert_eq!(guidance.public_mood, "bullish");
        assert_eq!(guidance.expected_market_direction, "upside bias");
        assert_eq!(guidance.buy_candidates[0].row.symbol, "BUY");
        assert_eq!(guidance.sell_candidates[0].row.symbol, "SELL");
        assert_eq!(guidance.hold_candidates[0].row.symbol, "HOLD");
        assert_eq!(guidance.riskiest_bets[0].row.symbol, "HOLD");
        assert_eq!(guidance.safest_bets[0].row.symbol, "BUY");
    }

    #[test]
    fn test_mood_without_news() {
        let guidance = build_market_guidance(&[], &NewsSummary::default());
        assert_eq!(guidance.public_mood, "neutral");
        assert_eq!(guidance.expected_market_direction, "range-bound");
        assert!(guidance.signals.is_empty());
    }
}
