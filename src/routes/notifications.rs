use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ManualNotificationRequest, NotificationQuery};
use crate::services::notification_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/users/:user_id/notifications",
            get(list_notifications).post(create_manual_notification),
        )
        .route("/users/:user_id/notifications/unread-count", get(unread_count))
        .route("/users/:user_id/notifications/read-all", post(mark_all_read))
        .route("/users/:user_id/notifications/:id/read", post(mark_read))
        .route("/users/:user_id/notifications/:id", delete(delete_notification))
}

/// GET /api/users/:user_id/notifications
async fn list_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<NotificationQuery>,
) -> Result<impl IntoResponse, AppError> {
    info!("GET /api/users/{}/notifications", user_id);
    let notifications = notification_service::list(state.store.as_ref(), user_id, query).await?;
    Ok(Json(notifications))
}

/// POST /api/users/:user_id/notifications
/// Manual test form
async fn create_manual_notification(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<ManualNotificationRequest>,
) -> Result<impl IntoResponse, AppError> {
    info!("POST /api/users/{}/notifications", user_id);
    let notification =
        notification_service::create_manual(state.store.as_ref(), user_id, request).await?;
    Ok((StatusCode::CREATED, Json(notification)))
}

async fn unread_count(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let count = notification_service::unread_count(state.store.as_ref(), user_id).await?;
    Ok(Json(json!({ "count": count })))
}

async fn mark_read(
    State(state): State<AppState>,
    Path((user_id, id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    info!("POST /api/users/{}/notifications/{}/read", user_id, id);
    let notification = notification_service::mark_read(state.store.as_ref(), user_id, id).await?;
    Ok(Json(notification))
}

async fn mark_all_read(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    info!("POST /api/users/{}/notifications/read-all", user_id);
    let updated = notification_service::mark_all_read(state.store.as_ref(), user_id).await?;
    Ok(Json(json!({ "updated": updated })))
}

async fn delete_notification(
    State(state): State<AppState>,
    Path((user_id, id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    info!("DELETE /api/users/{}/notifications/{}", user_id, id);
    notification_service::delete(state.store.as_ref(), user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
