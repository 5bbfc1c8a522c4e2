//! Refresh job state machine
//!
//! One process-wide [`RefreshJob`] tracks the current (or last) refresh run:
//!
//! ```text
//! idle ──begin──> running ──complete──> completed
//!                   │  ▲                    │
//!        set_total/ │  │ begin              │ begin
//!       record_step └──┘ <──────────────────┤
//!                   └──fail──> failed ──────┘
//! ```
//!
//! Illegal transitions return a [`TransitionError`] and leave the job as it was.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Highest percentage reported before a run has completed
const MAX_RUNNING_PERCENT: u8 = 99;

/// Lifecycle state of the refresh job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl RefreshState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RefreshState::Completed | RefreshState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshState::Idle => "idle",
            RefreshState::Running => "running",
            RefreshState::Completed => "completed",
            RefreshState::Failed => "failed",
        }
    }
}

impl fmt::Display for RefreshState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected state machine transition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A refresh is already running")]
    AlreadyRunning,

    #[error("Cannot {action} while the refresh job is {state}")]
    NotRunning {
        action: &'static str,
        state: RefreshState,
    },
}

/// Status payload returned to callers
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RefreshStatus {
    pub state: RefreshState,
    pub reason: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total_steps: u32,
    pub completed_steps: u32,
    pub progress_percent: u8,
    pub current_step: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub latest_generated_at: Option<DateTime<Utc>>,
    pub is_running: bool,
}

impl RefreshStatus {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// State of the single refresh job
#[derive(Debug, Clone, Default)]
pub struct RefreshJob {
    state: RefreshState,
    reason: Option<String>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    total_steps: u32,
    completed_steps: u32,
    progress_percent: u8,
    current_step: Option<String>,
    message: Option<String>,
    error: Option<String>,
    latest_generated_at: Option<DateTime<Utc>>,
}

impl RefreshJob {
    /// Idle job, seeded with the generation time of the stored snapshot
    pub fn new(latest_generated_at: Option<DateTime<Utc>>) -> Self {
        Self {
            latest_generated_at,
            ..Self::default()
        }
    }

    pub fn state(&self) -> RefreshState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RefreshState::Running
    }

    /// Start a new run; rejected while another run is in progress
    pub fn begin(&mut self, trigger: &str) -> Result<(), TransitionError> {
        if self.is_running() {
            return Err(TransitionError::AlreadyRunning);
        }

        *self = Self {
            state: RefreshState::Running,
            started_at: Some(Utc::now()),
            current_step: Some("Queued".to_string()),
            message: Some(format!("Refresh queued ({})", trigger)),
            latest_generated_at: self.latest_generated_at,
            ..Self::default()
        };
        Ok(())
    }

    /// Record the number of steps once instruments are enumerated
    pub fn set_total(&mut self, total_steps: u32) -> Result<(), TransitionError> {
        self.ensure_running("set the step total")?;

        self.total_steps = total_steps;
        self.completed_steps = self.completed_steps.min(total_steps);
        self.current_step = Some("Starting refresh".to_string());
        self.message = Some("Starting refresh".to_string());
        self.update_progress();
        Ok(())
    }

    /// Mark one unit of work as done
    pub fn record_step(&mut self, label: impl Into<String>) -> Result<(), TransitionError> {
        self.ensure_running("record a step")?;

        let next = self.completed_steps.saturating_add(1);
        self.completed_steps = if self.total_steps > 0 {
            next.min(self.total_steps)
        } else {
            next
        };

        let label = label.into();
        self.message = Some(label.clone());
        self.current_step = Some(label);
        self.update_progress();
        Ok(())
    }

    /// Finish the run after the snapshot generated at `generated_at` was persisted
    pub fn complete(&mut self, generated_at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.ensure_running("complete")?;

        self.state = RefreshState::Completed;
        self.completed_steps = self.completed_steps.max(self.total_steps);
        self.progress_percent = 100;
        self.finished_at = Some(Utc::now());
        self.latest_generated_at = Some(generated_at);
        self.current_step = None;
        self.message = Some("Refresh completed successfully.".to_string());
        Ok(())
    }

    /// Abort the run; counters keep their last observed values
    pub fn fail(&mut self, cause: impl Into<String>) -> Result<(), TransitionError> {
        self.ensure_running("fail")?;

        let cause = cause.into();
        self.state = RefreshState::Failed;
        self.finished_at = Some(Utc::now());
        self.reason = Some(cause.clone());
        self.error = Some(cause);
        self.current_step = None;
        self.message = Some("Refresh failed.".to_string());
        Ok(())
    }

    /// Point-in-time copy for callers
    pub fn status(&self) -> RefreshStatus {
        RefreshStatus {
            state: self.state,
            reason: self.reason.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
            total_steps: self.total_steps,
            completed_steps: self.completed_steps,
            progress_percent: self.progress_percent,
            current_step: self.current_step.clone(),
            message: self.message.clone(),
            error: self.error.clone(),
            latest_generated_at: self.latest_generated_at,
            is_running: self.is_running(),
        }
    }

    fn ensure_running(&self, action: &'static str) -> Result<(), TransitionError> {
        if self.is_running() {
            Ok(())
        } else {
            Err(TransitionError::NotRunning {
                action,
                state: self.state,
            })
        }
    }

    fn update_progress(&mut self) {
        let total = u64::from(self.total_steps.max(1));
        let percent = (100 * u64::from(self.completed_steps) / total)
            .min(u64::from(MAX_RUNNING_PERCENT)) as u8;
        self.progress_percent = self.progress_percent.max(percent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn running(total: u32) -> RefreshJob {
        let mut job = RefreshJob::new(None);
        job.begin("manual").unwrap();
        job.set_total(total).unwrap();
        job
    }

    #[test]
    fn test_begin_resets_run_fields() {
        let generated = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let mut job = RefreshJob::new(Some(generated));
        job.begin("manual").unwrap();

        let status = job.status();
        assert_eq!(status.state, RefreshState::Running);
        assert!(status.is_running);
        assert!(status.started_at.is_some());
        assert!(status.finished_at.is_none());
        assert_eq!(status.total_steps, 0);
        assert_eq!(status.progress_percent, 0);
        assert_eq!(status.current_step.as_deref(), Some("Queued"));
        assert_eq!(status.latest_generated_at, Some(generated));
    }

    #[test]
    fn test_second_begin_is_rejected_unchanged() {
        let mut job = running(4);
        job.record_step("Fetched stock AAPL").unwrap();
        let before = job.status();

        assert_eq!(job.begin("manual"), Err(TransitionError::AlreadyRunning));
        assert_eq!(job.status(), before);
    }

    #[test]
    fn test_progress_three_of_ten() {
        let mut job = running(10);
        for i in 0..3 {
            job.record_step(format!("step {}", i)).unwrap();
        }
        let status = job.status();
        assert_eq!(status.completed_steps, 3);
        assert_eq!(status.progress_percent, 30);
        assert_eq!(status.current_step.as_deref(), Some("step 2"));
    }

    #[test]
    fn test_progress_never_reaches_100_while_running() {
        let mut job = running(10);
        let mut last = 0;
        for _ in 0..12 {
            job.record_step("step").unwrap();
            let status = job.status();
            assert!(status.progress_percent >= last);
            assert!(status.progress_percent <= 99);
            assert!(status.completed_steps <= status.total_steps);
            last = status.progress_percent;
        }
        assert_eq!(job.status().completed_steps, 10);
        assert_eq!(job.status().progress_percent, 99);
    }

    #[test]
    fn test_progress_with_unknown_total() {
        let mut job = RefreshJob::new(None);
        job.begin("manual").unwrap();
        job.record_step("early").unwrap();
        // total of zero is treated as one step
        assert_eq!(job.status().progress_percent, 99);

        // learning the total never lowers the percentage
        job.set_total(10).unwrap();
        assert_eq!(job.status().progress_percent, 99);
        assert_eq!(job.status().completed_steps, 1);
    }

    #[test]
    fn test_complete() {
        let mut job = running(10);
        for _ in 0..10 {
            job.record_step("step").unwrap();
        }
        let generated = Utc::now();
        job.complete(generated).unwrap();

        let status = job.status();
        assert_eq!(status.state, RefreshState::Completed);
        assert_eq!(status.progress_percent, 100);
        assert_eq!(status.completed_steps, 10);
        assert_eq!(status.latest_generated_at, Some(generated));
        assert!(status.finished_at.is_some());
        assert!(status.current_step.is_none());
        assert!(!status.is_running);
    }

    #[test]
    fn test_fail_keeps_counters_and_latest() {
        let previous = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let mut job = RefreshJob::new(Some(previous));
        job.begin("scheduled").unwrap();
        job.set_total(4).unwrap();
        job.record_step("Fetched stock AAPL").unwrap();
        job.fail("disk full").unwrap();

        let status = job.status();
        assert_eq!(status.state, RefreshState::Failed);
        assert_eq!(status.error.as_deref(), Some("disk full"));
        assert_eq!(status.reason.as_deref(), Some("disk full"));
        assert!(status.finished_at.is_some());
        assert_eq!(status.completed_steps, 1);
        assert_eq!(status.progress_percent, 25);
        assert_eq!(status.latest_generated_at, Some(previous));
    }

    #[test]
    fn test_illegal_transitions_leave_job_untouched() {
        let mut job = RefreshJob::new(None);
        let before = job.status();

        assert!(matches!(
            job.record_step("x"),
            Err(TransitionError::NotRunning { state: RefreshState::Idle, .. })
        ));
        assert!(job.complete(Utc::now()).is_err());
        assert!(job.fail("x").is_err());
        assert_eq!(job.status(), before);

        let mut done = running(1);
        done.complete(Utc::now()).unwrap();
        assert!(done.fail("late").is_err());
        assert_eq!(done.status().state, RefreshState::Completed);
    }

    #[test]
    fn test_restart_after_terminal_resets_counters() {
        let mut job = running(2);
        job.record_step("a").unwrap();
        job.fail("boom").unwrap();

        job.begin("manual").unwrap();
        let status = job.status();
        assert_eq!(status.completed_steps, 0);
        assert_eq!(status.progress_percent, 0);
        assert!(status.error.is_none());
        assert!(status.reason.is_none());
    }

    #[test]
    fn test_status_wire_shape() {
        let value = serde_json::to_value(RefreshJob::new(None).status()).unwrap();
        assert_eq!(value["state"], "idle");
        assert_eq!(value["is_running"], false);
        assert!(value["latest_generated_at"].is_null());
        assert_eq!(value["progress_percent"], 0);
    }
}
