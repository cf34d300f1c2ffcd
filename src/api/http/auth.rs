// src/api/http/auth.rs

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    api::error::{ApiError, ApiResult, IntoApiError},
    auth::{username_from_headers, verify_credentials, COOKIE_MAX_AGE, SESSION_COOKIE},
    config::CONFIG,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub username: String,
    pub password: String,
}

/// Resolve the authenticated user for a request, or reject with 401.
pub async fn require_user(
    app: &AppState,
    headers: &HeaderMap,
) -> ApiResult<crate::auth::User> {
    let username = username_from_headers(headers)
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

    app.users
        .get_or_create(&username)
        .await
        .into_api_error("Failed to resolve user")
}

/// POST /auth/login
pub async fn login(
    State(app): State<Arc<AppState>>,
    Json(payload): Json<LoginPayload>,
) -> ApiResult<impl IntoResponse> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }

    if CONFIG.users.is_empty() {
        return Err(ApiError::internal("Authentication not configured"));
    }

    if !verify_credentials(&CONFIG.users, &payload.username, &payload.password) {
        return Err(ApiError::unauthorized("Invalid username or password"));
    }

    app.users
        .get_or_create(&payload.username)
        .await
        .into_api_error("Failed to create user")?;

    info!(username = %payload.username, "login");

    let cookie = format!(
        "{SESSION_COOKIE}={}; Max-Age={COOKIE_MAX_AGE}; Path=/; HttpOnly; SameSite=Lax{}",
        payload.username,
        if CONFIG.cookie_secure { "; Secure" } else { "" },
    );

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true })),
    ))
}

/// POST /auth/logout
pub async fn logout() -> impl IntoResponse {
    let cookie = format!("{SESSION_COOKIE}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax");
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true })),
    )
}

/// GET /auth/me
pub async fn me(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&app, &headers).await?;
    Ok(Json(json!({ "username": user.username })))
}
