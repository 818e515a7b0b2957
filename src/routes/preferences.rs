use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::UpdateUserPreference;
use crate::services::user_preference_service;
use crate::state::AppState;

/// Create the preferences router
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/users/:user_id/preferences",
            get(get_preferences).put(update_preferences),
        )
        .route("/users/:user_id/preferences/reset", post(reset_preferences))
}

/// GET /api/users/:user_id/preferences
/// Get notification preferences (created with defaults on first load)
pub async fn get_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    info!("GET /api/users/{}/preferences", user_id);
    let preferences = user_preference_service::get_or_create(state.store.as_ref(), user_id).await?;
    Ok(Json(preferences))
}

/// PUT /api/users/:user_id/preferences
pub async fn update_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(update): Json<UpdateUserPreference>,
) -> Result<impl IntoResponse, AppError> {
    info!("PUT /api/users/{}/preferences", user_id);
    let preferences =
        user_preference_service::update(state.store.as_ref(), user_id, update).await?;
    Ok(Json(preferences))
}

/// POST /api/users/:user_id/preferences/reset
pub async fn reset_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    info!("POST /api/users/{}/preferences/reset", user_id);
    let preferences = user_preference_service::reset(state.store.as_ref(), user_id).await?;
    Ok(Json(preferences))
}
