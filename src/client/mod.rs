//! Refresh client
//!
//! The consuming side of the refresh protocol: start a refresh (or join the
//! one already running), poll its status, estimate progress when the server
//! has not reported any, and give up locally after a timeout.

mod estimate;
mod http;
mod poller;

pub use estimate::{display_progress, estimate_refresh_ms, EstimateParams, ProgressView};
pub use http::HttpRefreshApi;
pub use poller::{spawn_periodic_sync, ClientPoller, PollerOptions, ProgressUpdate, RefreshOutcome};

use crate::db::Snapshot;
use crate::services::{RefreshStatus, StartRefreshResult};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors seen by the refresh client
#[derive(Error, Debug)]
pub enum ClientError {
    /// Stopped waiting locally; the server run is not affected
    #[error("Refresh did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Refresh failed: {0}")]
    RefreshFailed(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Server operations used by the poller
#[async_trait]
pub trait RefreshApi: Send + Sync {
    async fn start_refresh(&self) -> ClientResult<StartRefreshResult>;

    async fn refresh_status(&self) -> ClientResult<RefreshStatus>;

    async fn latest_snapshot(&self) -> ClientResult<Option<Snapshot>>;

    async fn snapshot_history(&self, limit: usize) -> ClientResult<Vec<Snapshot>>;
}
