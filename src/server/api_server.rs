//! HTTP server for the REST API

use crate::error::{AppError, Result};
use crate::server::handlers;
use crate::state::AppState;
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Build the API router with CORS and request tracing
pub fn router(state: Arc<AppState>) -> Router {
    let origins: Vec<HeaderValue> = state
        .settings
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ================================================================
        // Health check
        // ================================================================
        .route("/health", get(handlers::health_check))

        // ================================================================
        // Market overview refresh pipeline
        // ================================================================
        .route("/report/market-overview", get(handlers::latest_snapshot))
        .route("/report/market-overview/history", get(handlers::snapshot_history))
        .route("/report/market-overview/refresh", post(handlers::start_refresh))
        .route("/report/market-overview/refresh-status", get(handlers::refresh_status))

        // ================================================================
        // Market data pass-through
        // ================================================================
        .route("/market/quote", get(handlers::quote))
        .route("/market/stocks/daily", get(handlers::stock_daily))
        .route("/market/stocks/intraday", get(handlers::stock_intraday))
        .route("/market/fx/daily", get(handlers::fx_daily))
        .route("/market/crypto/daily", get(handlers::crypto_daily))
        .route("/market/universe-snapshot", get(handlers::universe_snapshot))

        // ================================================================
        // News and reports
        // ================================================================
        .route("/news/sentiment", get(handlers::news_sentiment))
        .route("/report/asset", get(handlers::asset_report))

        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// REST API server manager
pub struct ApiServer {
    state: Arc<AppState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ApiServer {
    /// Create a new server
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            shutdown_tx: None,
        }
    }

    /// Start the server on the configured host and port
    pub async fn start(&mut self) -> Result<SocketAddr> {
        let settings = &self.state.settings;
        let addr: SocketAddr = format!("{}:{}", settings.server_host, settings.server_port)
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid server address: {}", e)))?;

        self.start_on(addr).await
    }

    /// Start the server on an explicit address; returns the bound address
    pub async fn start_on(&mut self, addr: SocketAddr) -> Result<SocketAddr> {
        let app = router(self.state.clone());

        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);

        info!("Starting Market Analyzer API server on {}", local_addr);

        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("API server shutting down");
            });

            if let Err(e) = server.await {
                error!("API server error: {}", e);
            }
        });

        info!("=== Endpoints ===");
        info!("  GET  http://{}/health", local_addr);
        info!("  POST http://{}/report/market-overview/refresh", local_addr);
        info!("  GET  http://{}/report/market-overview/refresh-status", local_addr);
        info!("  GET  http://{}/report/market-overview", local_addr);
        info!("  GET  http://{}/report/market-overview/history?limit=48", local_addr);
        info!("  GET  http://{}/report/asset?kind=stock&symbol=AAPL", local_addr);
        info!("  GET  http://{}/market/quote?symbol=AAPL", local_addr);
        info!("  GET  http://{}/market/stocks/intraday?symbol=AAPL&interval=5min", local_addr);
        info!("  GET  http://{}/news/sentiment", local_addr);

        Ok(local_addr)
    }

    /// Stop the server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            info!("API server stop signal sent");
        }
    }

    /// Check if server is running
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.stop();
    }
}
