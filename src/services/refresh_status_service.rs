//! Refresh Status Service
//!
//! The only surface through which callers start refreshes or read their
//! outcome. Reads never fail because of a refresh error; those are carried
//! inside the status and the snapshot.

use crate::db::Snapshot;
use crate::error::{AppError, Result};
use crate::services::orchestrator::{RefreshTrigger, StartRefreshResult};
use crate::services::refresh_job::RefreshStatus;
use crate::state::AppState;
use tracing::info;

/// Default number of snapshots returned by `history`
pub const DEFAULT_HISTORY_LIMIT: usize = 48;
/// Largest accepted `history` limit
pub const MAX_HISTORY_LIMIT: usize = 500;

/// Refresh status service for business logic
pub struct RefreshStatusService;

impl RefreshStatusService {
    /// Current refresh job status
    pub fn status(state: &AppState) -> RefreshStatus {
        state.orchestrator.status()
    }

    /// Start a refresh; a start while running is rejected with the current status
    pub fn start(state: &AppState, trigger: RefreshTrigger) -> StartRefreshResult {
        let result = state.orchestrator.start(trigger);
        info!(
            "RefreshStatusService::start - {} accepted={}",
            trigger.as_str(),
            result.accepted
        );
        result
    }

    /// Latest persisted snapshot
    pub fn latest(state: &AppState) -> Result<Option<Snapshot>> {
        state.store.latest()
    }

    /// Most recent snapshots, oldest first
    pub fn history(state: &AppState, limit: Option<usize>) -> Result<Vec<Snapshot>> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {}, got {}",
                MAX_HISTORY_LIMIT, limit
            )));
        }
        state.store.history(limit)
    }
}
