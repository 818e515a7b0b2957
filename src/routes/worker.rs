use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::jobs::notification_worker_job;
use crate::models::{Frequency, JobRun, WorkerRunSummary};
use crate::services::job_scheduler_service::{execute_job_with_tracking, worker_job_name};
use crate::state::AppState;
use crate::store::JobRunStore;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/worker/notifications", post(trigger_notifications))
        .route("/worker/runs", get(recent_runs))
}

#[derive(Debug, Deserialize)]
struct TriggerParams {
    frequency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunsParams {
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub generated: usize,
    pub summary: WorkerRunSummary,
}

/// Accept only `Authorization: Bearer <WORKER_SECRET>`.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(secret) = state.worker_secret.as_deref().map(str::trim) else {
        warn!("Worker endpoint called but WORKER_SECRET is not configured");
        return Err(AppError::Unauthorized);
    };

    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    match token {
        Some(token) if token == secret => Ok(()),
        _ => {
            warn!("Rejected worker request with missing or invalid bearer token");
            Err(AppError::Unauthorized)
        }
    }
}

/// POST /api/worker/notifications?frequency=daily
async fn trigger_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<TriggerParams>,
) -> Result<Json<TriggerResponse>, AppError> {
    authorize(&state, &headers)?;

    let frequency = match params.frequency.as_deref() {
        Some(raw) => raw.parse::<Frequency>().map_err(AppError::Validation)?,
        None => Frequency::default(),
    };
    info!("POST /api/worker/notifications (frequency: {})", frequency);

    let ctx = state.job_context();
    let summary = execute_job_with_tracking(
        state.store.as_ref(),
        worker_job_name(frequency),
        notification_worker_job::run_notification_worker(&ctx, frequency),
    )
    .await?;

    Ok(Json(TriggerResponse {
        generated: summary.notifications_created,
        summary,
    }))
}

/// GET /api/worker/runs
async fn recent_runs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<RunsParams>,
) -> Result<Json<Vec<JobRun>>, AppError> {
    authorize(&state, &headers)?;

    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let runs = state.store.recent_job_runs(limit).await?;
    Ok(Json(runs))
}
