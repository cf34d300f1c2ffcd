// src/api/http/router.rs
// HTTP router composition for REST API endpoints

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::state::AppState;
use super::{
    auth::{login, logout, me},
    progress::user_progress,
    sessions::{
        chat_turn, create_session, evaluate_session, get_session, list_messages, list_sessions,
        validate_session,
    },
    upload::upload_excel,
};

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

/// Main HTTP router. Nested under /api in main.rs.
pub fn api_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        // Health
        .route("/health", get(health_handler))

        // Authentication
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))

        // Session lifecycle
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/{id}", get(get_session))
        .route("/sessions/{id}/validate", post(validate_session))
        .route("/sessions/{id}/chat", post(chat_turn))
        .route("/sessions/{id}/evaluate", post(evaluate_session))
        .route("/sessions/{id}/messages", get(list_messages))

        // Progress dashboard
        .route("/users/me/progress", get(user_progress))

        // Context data uploads
        .route("/upload/excel", post(upload_excel))

        .with_state(app_state)
}
