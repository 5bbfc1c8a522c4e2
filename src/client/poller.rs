//! Start-and-poll loop
//!
//! A start that the server rejects because a run is already in progress
//! joins that run instead; the poller never starts concurrent refreshes on
//! its own. Timing out only stops the local wait.

use crate::client::estimate::{display_progress, estimate_refresh_ms, EstimateParams, ProgressView};
use crate::client::{ClientError, ClientResult, RefreshApi};
use crate::db::{Coverage, Snapshot};
use crate::services::{RefreshState, RefreshStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Poller timing
#[derive(Debug, Clone)]
pub struct PollerOptions {
    pub poll_interval: Duration,
    pub timeout: Duration,
    /// Snapshots fetched after a completed run
    pub history_limit: usize,
    pub estimate: EstimateParams,
}

impl Default for PollerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1_250),
            timeout: Duration::from_secs(25 * 60),
            history_limit: 48,
            estimate: EstimateParams::default(),
        }
    }
}

/// One observation of the run, passed to the observer on every tick
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub status: RefreshStatus,
    pub elapsed: Duration,
    pub expected: Duration,
    pub view: ProgressView,
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub status: RefreshStatus,
    /// The start was rejected and the poller followed the running refresh
    pub joined: bool,
    pub latest: Option<Snapshot>,
    pub history: Vec<Snapshot>,
}

/// Client-side refresh driver
pub struct ClientPoller<A: RefreshApi> {
    api: Arc<A>,
    options: PollerOptions,
}

impl<A: RefreshApi> ClientPoller<A> {
    pub fn new(api: Arc<A>, options: PollerOptions) -> Self {
        Self { api, options }
    }

    /// Start (or join) a refresh and wait for it to finish
    pub async fn run_refresh_and_wait<F>(&self, mut observer: F) -> ClientResult<RefreshOutcome>
    where
        F: FnMut(&ProgressUpdate),
    {
        let coverage = match self.api.latest_snapshot().await {
            Ok(latest) => latest.map(|s| s.coverage).unwrap_or_default(),
            Err(e) => {
                debug!("No previous snapshot for the estimate: {}", e);
                Coverage::default()
            }
        };
        let expected_ms = estimate_refresh_ms(&coverage, &self.options.estimate);
        let expected = Duration::from_millis(expected_ms);

        let started_at = Instant::now();
        let started = self.api.start_refresh().await?;
        let joined = !started.accepted;
        if joined {
            info!("Refresh already running, joining it");
        } else {
            info!("Refresh started, expected to take about {:?}", expected);
        }

        let mut status = started.status;
        loop {
            let elapsed = started_at.elapsed();
            observer(&ProgressUpdate {
                view: display_progress(&status, elapsed.as_millis() as u64, expected_ms),
                status: status.clone(),
                elapsed,
                expected,
            });

            if status.is_terminal() {
                break;
            }
            if elapsed >= self.options.timeout {
                warn!("Gave up waiting for the refresh after {:?}", elapsed);
                return Err(ClientError::Timeout(self.options.timeout));
            }

            tokio::time::sleep(self.options.poll_interval).await;
            match self.api.refresh_status().await {
                Ok(next) => status = next,
                Err(e) => warn!("Refresh status poll failed, retrying: {}", e),
            }
        }

        if status.state == RefreshState::Failed {
            let cause = status
                .error
                .clone()
                .or_else(|| status.reason.clone())
                .unwrap_or_else(|| "Refresh failed".to_string());
            return Err(ClientError::RefreshFailed(cause));
        }

        let latest = self.api.latest_snapshot().await?;
        let history = self.api.snapshot_history(self.options.history_limit).await?;
        Ok(RefreshOutcome {
            status,
            joined,
            latest,
            history,
        })
    }
}

/// Run a refresh now and then every `every`, logging each outcome
pub fn spawn_periodic_sync<A>(poller: Arc<ClientPoller<A>>, every: Duration) -> JoinHandle<()>
where
    A: RefreshApi + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match poller.run_refresh_and_wait(|_| {}).await {
                Ok(outcome) => info!(
                    "Background sync finished ({}), {} snapshot(s) in history",
                    if outcome.joined { "joined" } else { "started" },
                    outcome.history.len()
                ),
                Err(e) => warn!("Background sync failed: {}", e),
            }
        }
    })
}
