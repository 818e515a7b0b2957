use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::routes::{chat, health, notifications, preferences, trends, worker};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::<AppState>::new()
        .merge(trends::router())
        .merge(notifications::router())
        .merge(preferences::router())
        .merge(worker::router())
        .merge(chat::router());

    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api", api)
        .layer(cors)
        .with_state(state)
}
