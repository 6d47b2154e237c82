pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::opinions::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .route(
            "/api/generate-opinions",
            post(handlers::handle_generate_opinions),
        )
        .route(
            "/api/available-models",
            get(handlers::handle_available_models),
        )
        .route(
            "/api/available-models/refresh",
            post(handlers::handle_refresh_models),
        )
        .with_state(state)
}
