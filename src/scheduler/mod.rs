//! Scheduler module for Market Analyzer
//!
//! Handles scheduled tasks including:
//! - Market overview refresh every half hour in the configured timezone

mod refresh;

pub use refresh::RefreshScheduler;
