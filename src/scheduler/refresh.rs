//! Half-hourly market overview refresh
//!
//! Starts a `scheduled` refresh at every :00 and :30 in the configured
//! timezone. A slot that arrives while a refresh is still running is skipped
//! by the single-flight gate.

use crate::services::{RefreshStatusService, RefreshTrigger};
use crate::state::AppState;
use chrono::{DateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

const SLOT_SECONDS: u64 = 30 * 60;
const MIN_WAIT: Duration = Duration::from_secs(1);

/// Refresh scheduler that fires on the half hour
pub struct RefreshScheduler {
    state: Arc<AppState>,
    timezone: Tz,
}

impl RefreshScheduler {
    /// Create a new refresh scheduler
    pub fn new(state: Arc<AppState>) -> Self {
        let timezone = state.settings.schedule_timezone;
        Self { state, timezone }
    }

    /// Calculate duration until the next :00 or :30 in `now`'s timezone
    pub fn duration_until_next_half_hour<T: TimeZone>(now: &DateTime<T>) -> Duration {
        let into_slot = u64::from(now.minute() % 30) * 60 + u64::from(now.second());
        let elapsed = Duration::from_secs(into_slot)
            + Duration::from_nanos(u64::from(now.nanosecond() % 1_000_000_000));

        Duration::from_secs(SLOT_SECONDS)
            .saturating_sub(elapsed)
            .max(MIN_WAIT)
    }

    /// Start the scheduler loop on the tokio runtime
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Refresh scheduler started ({})", self.timezone.name());

            loop {
                let now = Utc::now().with_timezone(&self.timezone);
                let wait = Self::duration_until_next_half_hour(&now);
                debug!(
                    "Next scheduled refresh in {} minutes {} seconds",
                    wait.as_secs() / 60,
                    wait.as_secs() % 60
                );

                tokio::time::sleep(wait).await;
                self.fire();
            }
        })
    }

    /// Request a scheduled refresh; returns whether it was accepted
    fn fire(&self) -> bool {
        let result = RefreshStatusService::start(&self.state, RefreshTrigger::Scheduled);
        if result.accepted {
            info!("Scheduled refresh started");
        } else {
            info!(
                "Scheduled refresh skipped, job is {}",
                result.status.state.as_str()
            );
        }
        result.accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::RefreshState;
    use crate::testing::{app_state, FakeProvider};

    fn at(tz: Tz, h: u32, m: u32, s: u32) -> DateTime<Tz> {
        tz.with_ymd_and_hms(2024, 5, 10, h, m, s).unwrap()
    }

    #[test]
    fn test_duration_until_next_half_hour() {
        let tz = Tz::UTC;
        assert_eq!(
            RefreshScheduler::duration_until_next_half_hour(&at(tz, 9, 10, 0)),
            Duration::from_secs(20 * 60)
        );
        assert_eq!(
            RefreshScheduler::duration_until_next_half_hour(&at(tz, 9, 45, 30)),
            Duration::from_secs(14 * 60 + 30)
        );
        // Exactly on a slot waits for the following one
        assert_eq!(
            RefreshScheduler::duration_until_next_half_hour(&at(tz, 9, 30, 0)),
            Duration::from_secs(30 * 60)
        );
        assert_eq!(
            RefreshScheduler::duration_until_next_half_hour(&at(tz, 23, 59, 59)),
            MIN_WAIT
        );
    }

    #[test]
    fn test_slots_follow_local_time() {
        // Kathmandu is UTC+05:45, so local half hours are not UTC half hours
        let tz: Tz = "Asia/Kathmandu".parse().unwrap();
        let local = at(tz, 10, 0, 0);
        let utc = local.with_timezone(&Utc);
        assert_eq!(utc.minute(), 15);
        assert_eq!(
            RefreshScheduler::duration_until_next_half_hour(&local),
            Duration::from_secs(30 * 60)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fire_starts_scheduled_refresh_once() {
        let state = app_state(FakeProvider::default(), "AAPL");
        let scheduler = RefreshScheduler::new(state.clone());

        assert!(scheduler.fire());
        // The slot overlaps the running refresh and is skipped
        assert!(!scheduler.fire());
        assert_eq!(RefreshStatusService::status(&state).state, RefreshState::Running);

        while !RefreshStatusService::status(&state).is_terminal() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(RefreshStatusService::status(&state).state, RefreshState::Completed);
        let history = RefreshStatusService::history(&state, None).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reason, "scheduled");
    }
}
