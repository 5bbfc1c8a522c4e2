//! Refresh orchestrator
//!
//! Runs the market overview pipeline in a background task:
//! 1. Enumerate the configured instruments (stocks, FX pairs, cryptos)
//! 2. Fetch and summarise each daily series under the call pacer
//! 3. One best-effort news sentiment pass
//! 4. Score signals, build guidance and persist the snapshot
//!
//! Every step is reported to the shared [`RefreshJob`]. At most one run is
//! active at a time: the state check and the transition to running happen
//! under the same lock.

use crate::analytics::guidance::DISCLAIMER;
use crate::analytics::{
    aggregate_news_sentiment, build_market_guidance, summarize_series, MarketRow, NewsSummary,
};
use crate::config::Watchlist;
use crate::db::{Coverage, InstrumentError, Snapshot, SnapshotStore};
use crate::error::{AppError, Result};
use crate::providers::types::{AssetClass, Instrument, NewsQuery, OutputSize};
use crate::providers::{MarketDataProvider, ProviderResult};
use crate::rate_limiter::CallPacer;
use crate::services::refresh_job::{RefreshJob, RefreshStatus, TransitionError};
use chrono::Utc;
use chrono_tz::Tz;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const COVERAGE_NOTE: &str =
    "Coverage is based on configured watchlists and not every global tradable instrument.";

/// What caused a refresh run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshTrigger {
    Manual,
    Scheduled,
}

impl RefreshTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshTrigger::Manual => "manual",
            RefreshTrigger::Scheduled => "scheduled",
        }
    }
}

/// Answer to a start request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartRefreshResult {
    pub accepted: bool,
    pub status: RefreshStatus,
}

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub watchlist: Watchlist,
    /// Cooldown-and-retry attempts per call after the provider throttles
    pub rate_limit_retries: u32,
    pub timezone: Tz,
}

/// Runs refreshes and owns the refresh job
pub struct RefreshOrchestrator {
    job: Mutex<RefreshJob>,
    provider: Arc<dyn MarketDataProvider>,
    store: Arc<dyn SnapshotStore>,
    pacer: Arc<CallPacer>,
    config: OrchestratorConfig,
}

impl RefreshOrchestrator {
    /// Create the orchestrator, seeding the job from the latest stored snapshot
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        store: Arc<dyn SnapshotStore>,
        pacer: Arc<CallPacer>,
        config: OrchestratorConfig,
    ) -> Result<Self> {
        let latest_generated_at = store.latest()?.map(|s| s.generated_at);

        Ok(Self {
            job: Mutex::new(RefreshJob::new(latest_generated_at)),
            provider,
            store,
            pacer,
            config,
        })
    }

    /// Current job status
    pub fn status(&self) -> RefreshStatus {
        self.job.lock().status()
    }

    /// Start a refresh in the background unless one is already running
    pub fn start(self: &Arc<Self>, trigger: RefreshTrigger) -> StartRefreshResult {
        let (accepted, status) = {
            let mut job = self.job.lock();
            match job.begin(trigger.as_str()) {
                Ok(()) => (true, job.status()),
                Err(TransitionError::AlreadyRunning) => (false, job.status()),
                Err(e) => {
                    warn!("Unexpected refresh start rejection: {}", e);
                    (false, job.status())
                }
            }
        };

        if !accepted {
            debug!("Refresh already running, {} start rejected", trigger.as_str());
            return StartRefreshResult { accepted, status };
        }

        let run_id = Uuid::new_v4();
        info!("Refresh {} accepted ({})", run_id, trigger.as_str());

        let this = Arc::clone(self);
        let run = tokio::spawn(async move {
            this.execute(run_id, trigger).await;
        });

        // A panicking run must still leave the job terminal, or every later
        // start would be rejected as already running.
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = run.await {
                error!("Refresh {} task aborted: {}", run_id, e);
                let cause = if e.is_panic() {
                    "Refresh task panicked"
                } else {
                    "Refresh task was cancelled"
                };
                this.transition(|job| job.fail(cause));
            }
        });

        StartRefreshResult { accepted, status }
    }

    async fn execute(&self, run_id: Uuid, trigger: RefreshTrigger) {
        match self.run(run_id, trigger).await {
            Ok(snapshot) => {
                info!(
                    "Refresh {} completed: {} signals, {} errors",
                    run_id,
                    snapshot.guidance.signals.len(),
                    snapshot.errors.len()
                );
                self.transition(|job| job.complete(snapshot.generated_at));
            }
            Err(e) => {
                error!("Refresh {} failed: {}", run_id, e);
                self.transition(|job| job.fail(e.to_string()));
            }
        }
    }

    async fn run(&self, run_id: Uuid, trigger: RefreshTrigger) -> Result<Snapshot> {
        let instruments = self.config.watchlist.enumerate()?;
        let total_steps = instruments.len() as u32 + 1;
        self.transition(|job| job.set_total(total_steps));
        debug!("Refresh {}: {} steps", run_id, total_steps);

        let mut stocks = Vec::new();
        let mut fx = Vec::new();
        let mut crypto = Vec::new();
        let mut errors = Vec::new();

        for instrument in &instruments {
            match self.fetch_row(instrument).await {
                Ok(row) => match instrument.asset_class {
                    AssetClass::Stock => stocks.push(row),
                    AssetClass::Fx => fx.push(row),
                    AssetClass::Crypto => crypto.push(row),
                },
                Err(e) => {
                    warn!(
                        "Refresh {}: {} {} failed: {}",
                        run_id, instrument.asset_class, instrument.symbol, e
                    );
                    errors.push(InstrumentError {
                        asset_class: instrument.asset_class.as_str().to_string(),
                        symbol: instrument.symbol.clone(),
                        error: e.to_string(),
                    });
                }
            }
            let label = format!("Fetched {} {}", instrument.asset_class.label(), instrument.symbol);
            self.transition(|job| job.record_step(label));
        }

        let query = &NewsQuery::market_overview();
        let provider = &self.provider;
        let news = match self.paced(move || provider.news_sentiment(query)).await {
            Ok(feed) => aggregate_news_sentiment(&feed),
            Err(e) => {
                warn!("Refresh {}: news sentiment failed: {}", run_id, e);
                errors.push(InstrumentError {
                    asset_class: "news".to_string(),
                    symbol: query_label(query),
                    error: e.to_string(),
                });
                NewsSummary::default()
            }
        };
        self.transition(|job| job.record_step("Fetched market news sentiment"));

        for row in stocks.iter_mut().chain(fx.iter_mut()).chain(crypto.iter_mut()) {
            row.sentiment = sentiment_for(&news, row);
        }

        let rows: Vec<MarketRow> = stocks.iter().chain(&fx).chain(&crypto).cloned().collect();
        let guidance = build_market_guidance(&rows, &news);

        let snapshot = Snapshot {
            generated_at: Utc::now(),
            run_id,
            reason: trigger.as_str().to_string(),
            timezone: self.config.timezone.name().to_string(),
            coverage: Coverage {
                stocks: stocks.len(),
                fx_pairs: fx.len(),
                cryptos: crypto.len(),
            },
            stocks,
            fx,
            crypto,
            news,
            guidance,
            errors,
            notes: vec![COVERAGE_NOTE.to_string(), DISCLAIMER.to_string()],
        };

        self.store
            .append(&snapshot)
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        Ok(snapshot)
    }

    /// Fetch and summarise one instrument
    async fn fetch_row(&self, instrument: &Instrument) -> ProviderResult<MarketRow> {
        let provider = &self.provider;
        let series = self
            .paced(move || provider.daily_series(instrument, OutputSize::Compact))
            .await?;
        let summary = summarize_series(&series);

        Ok(MarketRow {
            asset_class: instrument.asset_class,
            symbol: instrument.symbol.clone(),
            price: summary.latest_close,
            momentum_1d: summary.momentum_1d,
            volatility_proxy: summary.volatility_proxy,
            sentiment: None,
            last_refreshed: series.last_refreshed,
        })
    }

    /// Issue a provider call under the pacer, cooling down and retrying when throttled
    async fn paced<T, F, Fut>(&self, mut call: F) -> ProviderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        let mut retries = 0;
        loop {
            self.pacer.wait_if_needed().await;
            match call().await {
                Err(e) if e.is_rate_limited() && retries < self.config.rate_limit_retries => {
                    retries += 1;
                    warn!(
                        "Provider throttled, retry {}/{} after cooldown",
                        retries, self.config.rate_limit_retries
                    );
                    self.pacer.cooldown().await;
                }
                other => return other,
            }
        }
    }

    fn transition<F>(&self, apply: F)
    where
        F: FnOnce(&mut RefreshJob) -> std::result::Result<(), TransitionError>,
    {
        if let Err(e) = apply(&mut self.job.lock()) {
            warn!("Ignored refresh job transition: {}", e);
        }
    }
}

/// News sentiment for a row; crypto and FX tickers carry a provider prefix
fn sentiment_for(news: &NewsSummary, row: &MarketRow) -> Option<f64> {
    news.sentiment_for(&row.symbol).or_else(|| match row.asset_class {
        AssetClass::Stock => None,
        AssetClass::Crypto => news.sentiment_for(&format!("CRYPTO:{}", row.symbol)),
        AssetClass::Fx => {
            let (base, _) = row.symbol.split_once('/')?;
            news.sentiment_for(&format!("FOREX:{}", base))
        }
    })
}

fn query_label(query: &NewsQuery) -> String {
    query
        .topics
        .clone()
        .or_else(|| query.tickers.clone())
        .unwrap_or_else(|| "market".to_string())
}
