//! Outbound call pacing for the market data provider
//!
//! The provider publishes a per-minute call budget. Every outbound call
//! reserves a slot with the [`CallPacer`], which enforces:
//! - a fixed minimum spacing between consecutive calls
//! - at most `max_calls_per_window` calls in any rolling window (one minute)
//! - a cooldown after the provider reports throttling
//!
//! Slot reservation is a pure function of the supplied instant so the policy
//! can be tested without sleeping; [`CallPacer::wait_if_needed`] is the async
//! wrapper used by callers.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Length of the rolling budget window
pub const BUDGET_WINDOW: Duration = Duration::from_secs(60);

/// Pacing policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacerConfig {
    /// Minimum time between two consecutive calls
    pub min_spacing: Duration,
    /// Maximum calls allowed inside one window
    pub max_calls_per_window: u32,
    /// Rolling window length
    pub window: Duration,
}

impl PacerConfig {
    pub fn per_minute(min_spacing: Duration, max_calls_per_minute: u32) -> Self {
        Self {
            min_spacing,
            max_calls_per_window: max_calls_per_minute.max(1),
            window: BUDGET_WINDOW,
        }
    }
}

#[derive(Debug, Default)]
struct PacerState {
    /// Scheduled start of every call still inside the window, oldest first
    calls: VecDeque<Instant>,
    /// No call may start before this instant (set by cooldowns)
    blocked_until: Option<Instant>,
}

/// Fixed-spacing, rolling-window call limiter
#[derive(Debug)]
pub struct CallPacer {
    config: PacerConfig,
    state: Mutex<PacerState>,
}

impl CallPacer {
    pub fn new(config: PacerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(PacerState::default()),
        }
    }

    /// Current pacing policy
    pub fn config(&self) -> PacerConfig {
        self.config
    }

    /// Reserve the next call slot as seen at `now`
    ///
    /// Returns how long the caller has to wait before issuing its call. The
    /// slot is recorded immediately, so concurrent callers queue behind each
    /// other instead of all waking at the same instant.
    pub fn reserve(&self, now: Instant) -> Duration {
        let config = self.config();
        let mut state = self.state.lock();

        let mut start = now;
        if let Some(blocked_until) = state.blocked_until {
            if blocked_until > start {
                start = blocked_until;
            } else {
                state.blocked_until = None;
            }
        }
        if let Some(&last) = state.calls.back() {
            start = start.max(last + config.min_spacing);
        }

        Self::evict(&mut state.calls, start, config.window);
        if state.calls.len() >= config.max_calls_per_window as usize {
            let excess = state.calls.len() + 1 - config.max_calls_per_window as usize;
            // The new call may start once the oldest `excess` calls have left the window
            if let Some(&boundary) = state.calls.get(excess - 1) {
                start = start.max(boundary + config.window);
            }
            Self::evict(&mut state.calls, start, config.window);
        }

        state.calls.push_back(start);
        start.saturating_duration_since(now)
    }

    /// Record that the provider throttled us at `now`
    ///
    /// Blocks new reservations until a full window has elapsed and returns the
    /// wait the caller should observe before retrying.
    pub fn reserve_cooldown(&self, now: Instant) -> Duration {
        let window = self.config().window;
        let mut state = self.state.lock();

        let until = now + window;
        let blocked_until = match state.blocked_until {
            Some(existing) if existing > until => existing,
            _ => until,
        };
        state.blocked_until = Some(blocked_until);
        state.calls.clear();

        blocked_until.saturating_duration_since(now)
    }

    /// Wait until the next call is allowed under the pacing policy
    pub async fn wait_if_needed(&self) -> Duration {
        let wait = self.reserve(Instant::now());
        if !wait.is_zero() {
            tracing::debug!("Pacing provider call, waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }
        wait
    }

    /// Wait out a provider-reported throttle
    pub async fn cooldown(&self) -> Duration {
        let wait = self.reserve_cooldown(Instant::now());
        tracing::warn!("Provider call budget exhausted, cooling down for {:?}", wait);
        tokio::time::sleep(wait).await;
        wait
    }

    fn evict(calls: &mut VecDeque<Instant>, at: Instant, window: Duration) {
        while let Some(&front) = calls.front() {
            if at.saturating_duration_since(front) >= window {
                calls.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pacer(spacing_ms: u64, budget: u32) -> CallPacer {
        CallPacer::new(PacerConfig::per_minute(
            Duration::from_millis(spacing_ms),
            budget,
        ))
    }

    #[test]
    fn test_min_spacing() {
        let pacer = pacer(1000, 100);
        let t0 = Instant::now();

        assert_eq!(pacer.reserve(t0), Duration::ZERO);
        assert_eq!(pacer.reserve(t0), Duration::from_millis(1000));
        // Slot for the third call queues behind the second
        assert_eq!(pacer.reserve(t0), Duration::from_millis(2000));
        // Well after the last slot no wait is needed
        assert_eq!(pacer.reserve(t0 + Duration::from_secs(10)), Duration::ZERO);
    }

    #[test]
    fn test_budget_exhaustion_waits_for_window() {
        let pacer = pacer(0, 3);
        let t0 = Instant::now();

        for _ in 0..3 {
            assert_eq!(pacer.reserve(t0), Duration::ZERO);
        }
        // Fourth call must wait until the first leaves the window
        assert_eq!(pacer.reserve(t0), Duration::from_secs(60));
    }

    #[test]
    fn test_window_slides() {
        let pacer = pacer(0, 2);
        let t0 = Instant::now();

        assert_eq!(pacer.reserve(t0), Duration::ZERO);
        assert_eq!(pacer.reserve(t0 + Duration::from_secs(10)), Duration::ZERO);
        // Oldest call at t0 frees its slot at t0 + 60s
        assert_eq!(
            pacer.reserve(t0 + Duration::from_secs(20)),
            Duration::from_secs(40)
        );
        // The next slot opens when the t0+10s call leaves the window
        assert_eq!(
            pacer.reserve(t0 + Duration::from_secs(60)),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_cooldown_blocks_reservations() {
        let pacer = pacer(0, 100);
        let t0 = Instant::now();

        assert_eq!(pacer.reserve(t0), Duration::ZERO);
        assert_eq!(pacer.reserve_cooldown(t0), Duration::from_secs(60));
        assert_eq!(
            pacer.reserve(t0 + Duration::from_secs(1)),
            Duration::from_secs(59)
        );
        // Once the cooldown has passed calls flow again
        assert_eq!(
            pacer.reserve(t0 + Duration::from_secs(120)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_per_minute_budget_floor() {
        let config = pacer(1000, 0).config();
        assert_eq!(config.max_calls_per_window, 1);
        assert_eq!(config.window, BUDGET_WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_if_needed_sleeps() {
        let pacer = pacer(1500, 100);
        let started = Instant::now();

        assert_eq!(pacer.wait_if_needed().await, Duration::ZERO);
        assert_eq!(pacer.wait_if_needed().await, Duration::from_millis(1500));
        assert!(started.elapsed() >= Duration::from_millis(1500));
    }
}
