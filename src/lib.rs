//! Market Analyzer - market overview and sentiment dashboard backend
//!
//! Periodically pulls stocks, FX, crypto and news sentiment from Alpha
//! Vantage, scores heuristic buy/sell/hold signals and exposes a
//! progress-tracked refresh pipeline over HTTP.

pub mod analytics;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod providers;
pub mod rate_limiter;
pub mod scheduler;
pub mod server;
pub mod services;
pub mod state;

#[cfg(test)]
mod testing;

use config::Settings;
use scheduler::RefreshScheduler;
use server::ApiServer;
use state::AppState;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing with `RUST_LOG`, defaulting to `default_filter`
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize and run the service until Ctrl-C
pub async fn run() -> error::Result<()> {
    init_tracing("market_analyzer=debug,tower_http=info");

    tracing::info!("Starting Market Analyzer...");

    let settings = Settings::from_env()?;
    tracing::info!(
        "Watchlist: {} stocks, {} FX pairs, {} cryptos; {} API key(s)",
        settings.watchlist.stocks.len(),
        settings.watchlist.fx_pairs.len(),
        settings.watchlist.cryptos.len(),
        settings.api_keys.len()
    );

    let app_state = Arc::new(AppState::new(settings)?);
    tracing::info!("Application state initialized");

    let scheduler = if app_state.settings.scheduler_enabled {
        tracing::info!("Refresh scheduler enabled");
        Some(RefreshScheduler::new(app_state.clone()).start())
    } else {
        tracing::info!("Refresh scheduler disabled");
        None
    };

    let mut server = ApiServer::new(app_state.clone());
    server.start().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    server.stop();
    if let Some(handle) = scheduler {
        handle.abort();
    }
    Ok(())
}
