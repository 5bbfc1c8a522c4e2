//! Refresh duration estimate and displayed progress
//!
//! Both functions are pure: the poller samples the clock once per tick and
//! passes the elapsed time in.

use crate::db::Coverage;
use crate::services::RefreshStatus;
use std::time::Duration;

/// Timing model of a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimateParams {
    /// Assumed cost of one provider call
    pub call_spacing: Duration,
    /// Provider calls allowed per budget window
    pub calls_per_window: u32,
    pub window: Duration,
    /// Floor of the estimate
    pub min_expected: Duration,
}

impl Default for EstimateParams {
    fn default() -> Self {
        Self {
            call_spacing: Duration::from_millis(1_100),
            calls_per_window: 100,
            window: Duration::from_secs(60),
            min_expected: Duration::from_secs(90),
        }
    }
}

/// Expected refresh duration in milliseconds
///
/// One call per instrument plus one news call, each costing `call_spacing`,
/// plus the unused remainder of every additional budget window.
pub fn estimate_refresh_ms(coverage: &Coverage, params: &EstimateParams) -> u64 {
    let calls = coverage.total() as u64 + 1;
    let spacing_ms = params.call_spacing.as_millis() as u64;
    let budget = u64::from(params.calls_per_window.max(1));

    let base_ms = calls * spacing_ms;
    let extra_windows = calls.div_ceil(budget).saturating_sub(1);
    let wait_per_window_ms = (params.window.as_millis() as u64).saturating_sub(spacing_ms * budget);

    (base_ms + extra_windows * wait_per_window_ms).max(params.min_expected.as_millis() as u64)
}

/// Progress as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressView {
    pub percent: u8,
    pub taking_longer_than_usual: bool,
    pub label: Option<String>,
}

/// Combine the server status with the local estimate
pub fn display_progress(status: &RefreshStatus, elapsed_ms: u64, expected_ms: u64) -> ProgressView {
    let percent = if status.is_terminal() {
        100
    } else if status.total_steps > 0 && status.progress_percent > 0 {
        status.progress_percent.clamp(5, 95)
    } else {
        let ratio = elapsed_ms as f64 / expected_ms.max(1) as f64;
        (ratio * 100.0).clamp(8.0, 95.0) as u8
    };

    ProgressView {
        percent,
        taking_longer_than_usual: !status.is_terminal() && elapsed_ms > expected_ms,
        label: status.current_step.clone().or_else(|| status.message.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::RefreshState;

    fn coverage(stocks: usize, fx_pairs: usize, cryptos: usize) -> Coverage {
        Coverage {
            stocks,
            fx_pairs,
            cryptos,
        }
    }

    fn running(total_steps: u32, progress_percent: u8) -> RefreshStatus {
        RefreshStatus {
            state: RefreshState::Running,
            total_steps,
            progress_percent,
            is_running: true,
            ..RefreshStatus::default()
        }
    }

    #[test]
    fn test_small_watchlist_uses_floor() {
        let params = EstimateParams::default();
        assert_eq!(estimate_refresh_ms(&coverage(5, 2, 3), &params), 90_000);
        assert_eq!(estimate_refresh_ms(&Coverage::default(), &params), 90_000);
    }

    #[test]
    fn test_large_watchlist_scales_with_calls() {
        let params = EstimateParams::default();
        // 250 calls at 1.1s; windows add nothing since 100 calls already take > 60s
        assert_eq!(estimate_refresh_ms(&coverage(200, 0, 49), &params), 275_000);
    }

    #[test]
    fn test_extra_windows_add_wait() {
        let params = EstimateParams {
            call_spacing: Duration::from_millis(500),
            ..EstimateParams::default()
        };
        // 250 calls: 125s of spacing plus two extra windows of 10s each
        assert_eq!(estimate_refresh_ms(&coverage(200, 0, 49), &params), 145_000);
    }

    #[test]
    fn test_estimated_progress_without_server_percentage() {
        let status = running(0, 0);
        assert_eq!(display_progress(&status, 0, 90_000).percent, 8);
        assert_eq!(display_progress(&status, 45_000, 90_000).percent, 50);
        assert_eq!(display_progress(&status, 200_000, 90_000).percent, 95);
    }

    #[test]
    fn test_server_percentage_is_clamped() {
        assert_eq!(display_progress(&running(10, 30), 0, 90_000).percent, 30);
        assert_eq!(display_progress(&running(10, 1), 0, 90_000).percent, 5);
        assert_eq!(display_progress(&running(10, 99), 0, 90_000).percent, 95);
    }

    #[test]
    fn test_terminal_and_taking_longer() {
        let done = RefreshStatus {
            state: RefreshState::Completed,
            progress_percent: 100,
            ..RefreshStatus::default()
        };
        let view = display_progress(&done, 500_000, 90_000);
        assert_eq!(view.percent, 100);
        assert!(!view.taking_longer_than_usual);

        assert!(display_progress(&running(10, 30), 90_001, 90_000).taking_longer_than_usual);
        assert!(!display_progress(&running(10, 30), 90_000, 90_000).taking_longer_than_usual);
    }
}
