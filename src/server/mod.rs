//! REST API server module
//!
//! Provides:
//! - Market overview refresh control and snapshots (/report/market-overview*)
//! - Pass-through market data (/market/*) and news sentiment (/news/sentiment)
//! - Single-asset reports (/report/asset)
//!
//! Usage:
//! 1. Configure `SERVER_HOST`/`SERVER_PORT` and `CORS_ORIGINS`
//! 2. `POST /report/market-overview/refresh` to start a refresh
//! 3. Poll `GET /report/market-overview/refresh-status` until it is terminal

mod api_server;
pub mod handlers;
mod types;

pub use api_server::{router, ApiServer};
pub use types::{
    HealthResponse,
    HistoryQuery,
    HistoryResponse,
    LatestResponse,
    StatusResponse,
};
