use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{TimeSeries, TrendAnalysisResponse};
use crate::services::trend_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trends/:keyword", get(get_series))
        .route("/trends/:keyword/latest", get(get_latest))
        .route("/trends/:keyword/analysis", get(get_analysis))
}

#[derive(Debug, Deserialize)]
struct SeriesParams {
    #[serde(default)]
    persist: bool,
}

#[derive(Debug, Deserialize)]
struct AnalysisParams {
    user_id: Option<Uuid>,
}

/// GET /api/trends/:keyword
/// Current search-interest series; falls back to the last snapshot when the
/// provider is unavailable.
async fn get_series(
    State(state): State<AppState>,
    Path(keyword): Path<String>,
    Query(params): Query<SeriesParams>,
) -> Result<Json<TimeSeries>, AppError> {
    info!("GET /api/trends/{} (persist: {})", keyword, params.persist);

    let series = trend_service::ingest(
        state.store.as_ref(),
        state.trend_provider.as_ref(),
        &keyword,
        params.persist,
    )
    .await?;

    Ok(Json(series))
}

/// GET /api/trends/:keyword/latest
async fn get_latest(
    State(state): State<AppState>,
    Path(keyword): Path<String>,
) -> Result<Json<TimeSeries>, AppError> {
    info!("GET /api/trends/{}/latest", keyword);
    let series = trend_service::latest_series(state.store.as_ref(), &keyword).await?;
    Ok(Json(series))
}

/// GET /api/trends/:keyword/analysis
async fn get_analysis(
    State(state): State<AppState>,
    Path(keyword): Path<String>,
    Query(params): Query<AnalysisParams>,
) -> Result<Json<TrendAnalysisResponse>, AppError> {
    info!("GET /api/trends/{}/analysis", keyword);

    let response = trend_service::analyze(
        state.store.as_ref(),
        state.trend_provider.as_ref(),
        &state.composer,
        state.significance,
        &keyword,
        params.user_id,
    )
    .await?;

    Ok(Json(response))
}
