//! Persisted snapshot models

use crate::analytics::{MarketGuidance, MarketRow, NewsSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of refreshed instruments per asset class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Coverage {
    pub stocks: usize,
    pub fx_pairs: usize,
    pub cryptos: usize,
}

impl Coverage {
    pub fn total(&self) -> usize {
        self.stocks + self.fx_pairs + self.cryptos
    }
}

/// A fetch that failed during a refresh run
///
/// `asset_class` is `stock`, `fx`, `crypto` or `news`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentError {
    pub asset_class: String,
    pub symbol: String,
    pub error: String,
}

/// Result of one successful refresh run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub generated_at: DateTime<Utc>,
    pub run_id: Uuid,
    /// What triggered the run (`manual` or `scheduled`)
    pub reason: String,
    pub timezone: String,
    pub coverage: Coverage,
    pub stocks: Vec<MarketRow>,
    pub fx: Vec<MarketRow>,
    pub crypto: Vec<MarketRow>,
    pub news: NewsSummary,
    pub guidance: MarketGuidance,
    pub errors: Vec<InstrumentError>,
    pub notes: Vec<String>,
}
