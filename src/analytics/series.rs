//! Daily series summaries

use crate::providers::types::DailySeries;
use serde::{Deserialize, Serialize};

/// Number of most recent closes used for momentum and volatility
const LOOKBACK: usize = 30;

/// Momentum and volatility derived from a daily series
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub latest_close: Option<f64>,
    pub momentum_1d: Option<f64>,
    pub volatility_proxy: Option<f64>,
}

/// Summarise a newest-first daily series
pub fn summarize_series(series: &DailySeries) -> SeriesSummary {
    let closes: Vec<f64> = series
        .points
        .iter()
        .filter_map(|p| p.close)
        .take(LOOKBACK)
        .collect();

    SeriesSummary {
        latest_close: series.latest_close(),
        momentum_1d: momentum(&closes),
        volatility_proxy: volatility(&closes),
    }
}

/// One-day return of the latest close
fn momentum(closes: &[f64]) -> Option<f64> {
    match closes {
        [latest, previous, ..] if *previous != 0.0 => Some((latest - previous) / previous),
        _ => None,
    }
}

/// Sample standard deviation of daily returns
fn volatility(closes: &[f64]) -> Option<f64> {
    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|w| w[0] != 0.0 && w[1] != 0.0)
        .map(|w| (w[0] - w[1]) / w[1])
        .collect();

    if returns.len() <= 2 {
        return None;
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance =
        returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (returns.len() - 1) as f64;
    Some(variance.sqrt())
}
