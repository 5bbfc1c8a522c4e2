//! Services Layer
//!
//! Business logic called by the REST API handlers and the scheduler.
//!
//! # Architecture
//!
//! ```text
//! REST API ───┐
//!             ├──> Services --> Provider / Snapshot store
//! Scheduler ──┘
//! ```
//!
//! # Services
//!
//! - `RefreshStatusService` - Start refreshes, read status, latest snapshot and history
//! - `MarketService` - Quotes, daily series, universe listing, news sentiment
//! - `ReportService` - Combined market + sentiment report for one asset
//!
//! The refresh pipeline itself lives in `orchestrator`, driving the
//! `refresh_job` state machine.

pub mod refresh_job;
pub mod orchestrator;
pub mod refresh_status_service;
pub mod market_service;
pub mod report_service;

// Re-export commonly used types and services
pub use refresh_job::{RefreshJob, RefreshState, RefreshStatus, TransitionError};
pub use orchestrator::{RefreshOrchestrator, RefreshTrigger, StartRefreshResult};
pub use refresh_status_service::RefreshStatusService;
pub use market_service::{MarketService, SeriesReport, UniverseSnapshot};
pub use report_service::{AssetReportRequest, AssetReportResult, ReportService};
