//! Application state management

use crate::config::Settings;
use crate::db::{SnapshotStore, SqliteSnapshotStore};
use crate::error::Result;
use crate::providers::{AlphaVantageProvider, MarketDataProvider};
use crate::rate_limiter::{CallPacer, PacerConfig};
use crate::services::orchestrator::{OrchestratorConfig, RefreshOrchestrator};
use std::sync::Arc;

/// Application state shared by the HTTP handlers and the scheduler
pub struct AppState {
    /// Loaded configuration
    pub settings: Settings,

    /// Market data provider
    pub provider: Arc<dyn MarketDataProvider>,

    /// Outbound call pacer shared by refreshes and pass-through routes
    pub pacer: Arc<CallPacer>,

    /// Snapshot history
    pub store: Arc<dyn SnapshotStore>,

    /// Refresh pipeline and its job state
    pub orchestrator: Arc<RefreshOrchestrator>,
}

impl AppState {
    /// Create application state backed by Alpha Vantage and the SQLite store
    pub fn new(settings: Settings) -> Result<Self> {
        let provider: Arc<dyn MarketDataProvider> = Arc::new(AlphaVantageProvider::new(&settings)?);
        let store: Arc<dyn SnapshotStore> = Arc::new(SqliteSnapshotStore::new(
            &settings.db_file,
            settings.history_limit,
        )?);

        tracing::info!("Snapshot store opened at {:?}", settings.db_file);
        Self::with_parts(settings, provider, store)
    }

    /// Create application state from explicit collaborators
    pub fn with_parts(
        settings: Settings,
        provider: Arc<dyn MarketDataProvider>,
        store: Arc<dyn SnapshotStore>,
    ) -> Result<Self> {
        let pacer = Arc::new(CallPacer::new(PacerConfig::per_minute(
            settings.call_spacing(),
            settings.max_calls_per_minute,
        )));

        let orchestrator = Arc::new(RefreshOrchestrator::new(
            provider.clone(),
            store.clone(),
            pacer.clone(),
            OrchestratorConfig {
                watchlist: settings.watchlist.clone(),
                rate_limit_retries: settings.rate_limit_retries,
                timezone: settings.schedule_timezone,
            },
        )?);

        Ok(Self {
            settings,
            provider,
            pacer,
            store,
            orchestrator,
        })
    }

    /// Wait for a pacer slot when server-side limiting is enabled
    pub async fn pace_pass_through(&self) {
        if self.settings.enable_server_rate_limit {
            self.pacer.wait_if_needed().await;
        }
    }
}
