// src/api/http/progress.rs

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use serde_json::json;

use crate::{
    api::error::{ApiResult, IntoApiError},
    progress,
    state::AppState,
};

use super::auth::require_user;

/// GET /users/me/progress
///
/// Time-ordered attempt history per use case, most recently touched first.
pub async fn user_progress(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&app, &headers).await?;

    let use_cases = progress::user_progress(&app.pool, &user.id)
        .await
        .into_api_error("Failed to fetch progress")?;

    Ok(Json(json!({ "useCases": use_cases })))
}
