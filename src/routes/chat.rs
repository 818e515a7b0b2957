use axum::{extract::State, routing::post, Json, Router};
use tracing::info;

use crate::errors::AppError;
use crate::models::{ChatRequest, ChatResponse};
use crate::services::chat_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/chat", post(chat))
}

/// POST /api/chat
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    info!("POST /api/chat (user: {})", request.user_id);
    let response =
        chat_service::reply(&state.llm, request.user_id, &request.message, &request.history)
            .await?;
    Ok(Json(response))
}
