//! REST API endpoint handlers

use crate::error::{AppError, Result};
use crate::providers::types::{
    Instrument, IntradayInterval, IntradaySeries, ListingState, NewsQuery, OutputSize, Quote,
};
use crate::analytics::NewsSummary;
use crate::server::types::*;
use crate::services::{
    AssetReportRequest, AssetReportResult, MarketService, RefreshStatusService, RefreshTrigger,
    ReportService, SeriesReport, StartRefreshResult, UniverseSnapshot,
};
use crate::state::AppState;
use axum::extract::{Json, Query, State};
use std::str::FromStr;
use std::sync::Arc;

type ApiState = State<Arc<AppState>>;

/// Parse an optional query parameter, reporting bad input as a validation error
fn parse_param<T: FromStr>(value: Option<&str>, name: &str) -> Result<Option<T>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| AppError::Validation(format!("invalid {}: '{}'", name, raw))),
    }
}

// ============================================================================
// Health Check
// ============================================================================

/// Health check endpoint - GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

// ============================================================================
// Market Overview Refresh
// ============================================================================

/// Start a refresh - POST /report/market-overview/refresh
pub async fn start_refresh(State(state): ApiState) -> Json<StartRefreshResult> {
    Json(RefreshStatusService::start(&state, RefreshTrigger::Manual))
}

/// Refresh status - GET /report/market-overview/refresh-status
pub async fn refresh_status(State(state): ApiState) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: RefreshStatusService::status(&state),
    })
}

/// Latest snapshot - GET /report/market-overview
pub async fn latest_snapshot(State(state): ApiState) -> Result<Json<LatestResponse>> {
    let latest = RefreshStatusService::latest(&state)?;
    Ok(Json(LatestResponse { latest }))
}

/// Snapshot history - GET /report/market-overview/history?limit=
pub async fn snapshot_history(
    State(state): ApiState,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>> {
    let limit = parse_param::<usize>(query.limit.as_deref(), "limit")?;
    let history = RefreshStatusService::history(&state, limit)?;
    Ok(Json(HistoryResponse { history }))
}

// ============================================================================
// Market Data
// ============================================================================

/// GET /market/quote?symbol=
pub async fn quote(State(state): ApiState, Query(query): Query<QuoteQuery>) -> Result<Json<Quote>> {
    Ok(Json(MarketService::quote(&state, &query.symbol).await?))
}

/// GET /market/stocks/daily?symbol=&outputsize=
pub async fn stock_daily(
    State(state): ApiState,
    Query(query): Query<StockDailyQuery>,
) -> Result<Json<SeriesReport>> {
    let instrument = Instrument::stock(&query.symbol);
    Ok(Json(
        MarketService::daily(&state, &instrument, query.outputsize).await?,
    ))
}

/// GET /market/stocks/intraday?symbol=&interval=&outputsize=
pub async fn stock_intraday(
    State(state): ApiState,
    Query(query): Query<StockIntradayQuery>,
) -> Result<Json<IntradaySeries>> {
    let interval = query
        .interval
        .as_deref()
        .unwrap_or_default()
        .parse::<IntradayInterval>()
        .map_err(AppError::Validation)?;
    let output_size = query
        .outputsize
        .as_deref()
        .unwrap_or_default()
        .parse::<OutputSize>()
        .map_err(AppError::Validation)?;
    Ok(Json(
        MarketService::intraday(&state, &query.symbol, interval, output_size).await?,
    ))
}

/// GET /market/fx/daily?from_symbol=&to_symbol=&outputsize=
pub async fn fx_daily(
    State(state): ApiState,
    Query(query): Query<FxDailyQuery>,
) -> Result<Json<SeriesReport>> {
    if query.from_symbol.trim().is_empty() || query.to_symbol.trim().is_empty() {
        return Err(AppError::Validation(
            "from_symbol and to_symbol required".to_string(),
        ));
    }
    let instrument = Instrument::fx(&query.from_symbol, &query.to_symbol);
    Ok(Json(
        MarketService::daily(&state, &instrument, query.outputsize).await?,
    ))
}

/// GET /market/crypto/daily?symbol=&market=
pub async fn crypto_daily(
    State(state): ApiState,
    Query(query): Query<CryptoDailyQuery>,
) -> Result<Json<SeriesReport>> {
    let instrument = Instrument::crypto(&query.symbol, &query.market);
    Ok(Json(
        MarketService::daily(&state, &instrument, OutputSize::Compact).await?,
    ))
}

/// GET /market/universe-snapshot?state=active|delisted
pub async fn universe_snapshot(
    State(state): ApiState,
    Query(query): Query<UniverseQuery>,
) -> Result<Json<UniverseSnapshot>> {
    let listing: ListingState = query.state.parse().map_err(AppError::Validation)?;
    Ok(Json(MarketService::universe(&state, listing).await?))
}

// ============================================================================
// News and Reports
// ============================================================================

/// GET /news/sentiment?tickers=&topics=&time_from=&time_to=&sort=&limit=
pub async fn news_sentiment(
    State(state): ApiState,
    Query(query): Query<NewsSentimentQuery>,
) -> Result<Json<NewsSummary>> {
    let query = NewsQuery::from(query);
    Ok(Json(MarketService::news_sentiment(&state, &query).await?))
}

/// GET /report/asset?kind=stock|fx|crypto&...
pub async fn asset_report(
    State(state): ApiState,
    Query(req): Query<AssetReportRequest>,
) -> Result<Json<AssetReportResult>> {
    Ok(Json(ReportService::asset_report(&state, &req).await?))
}
