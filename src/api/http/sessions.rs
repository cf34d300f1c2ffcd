// src/api/http/sessions.rs
// Session lifecycle endpoints: create, list, inspect, validate, chat, evaluate.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    api::error::{ApiError, ApiResult, IntoApiError, IntoApiErrorOption},
    config::CONFIG,
    session::{MessageRole, NewSession, Session, SessionStatus},
    state::AppState,
    validator::{has_blocking_errors, run_checks},
};

use super::auth::require_user;

#[derive(Debug, Deserialize)]
pub struct CreateSessionPayload {
    pub problem_statement: Option<String>,
    pub system_prompt: Option<String>,
    pub use_case_prompt: Option<String>,
    pub context_data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatPayload {
    pub message: Option<String>,
}

/// POST /sessions
pub async fn create_session(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateSessionPayload>,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&app, &headers).await?;

    let (problem_statement, system_prompt) = match (
        payload.problem_statement.as_deref().filter(|s| !s.is_empty()),
        payload.system_prompt.as_deref().filter(|s| !s.is_empty()),
    ) {
        (Some(p), Some(s)) => (p, s),
        _ => {
            return Err(ApiError::bad_request(
                "Problem statement and system prompt are required",
            ))
        }
    };

    let session = app
        .sessions
        .create(NewSession {
            user_id: &user.id,
            problem_statement,
            system_prompt,
            use_case_prompt: payload.use_case_prompt.as_deref().filter(|s| !s.is_empty()),
            context_data: payload.context_data.as_deref().filter(|s| !s.is_empty()),
        })
        .await
        .into_api_error("Failed to create session")?;

    info!(session_id = %session.id, attempt = session.attempt_number, "session created");

    Ok(Json(json!({
        "success": true,
        "session_id": session.id,
        "attempt_number": session.attempt_number,
    })))
}

/// GET /sessions
pub async fn list_sessions(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&app, &headers).await?;

    let sessions = app
        .sessions
        .list_for_user(&user.id)
        .await
        .into_api_error("Failed to fetch sessions")?;

    let mut enriched = Vec::with_capacity(sessions.len());
    for session in sessions {
        let evaluation = if session.status == SessionStatus::Complete {
            app.evaluations
                .get_for_session(&session.id)
                .await
                .into_api_error("Failed to fetch evaluation")?
        } else {
            None
        };

        let mut value = serde_json::to_value(&session)
            .into_api_error("Failed to encode session")?;
        value["evaluation"] = serde_json::to_value(&evaluation)
            .into_api_error("Failed to encode evaluation")?;
        enriched.push(value);
    }

    Ok(Json(json!({ "sessions": enriched })))
}

/// GET /sessions/{id}
///
/// The client polls this to observe the `evaluating → complete` transition,
/// so it carries the message count and (once present) the evaluation.
pub async fn get_session(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_user(&app, &headers).await?;

    let session = fetch_session(&app, &id).await?;

    let message_count = app
        .sessions
        .count_messages(&session.id)
        .await
        .into_api_error("Failed to count messages")?;

    let evaluation = app
        .evaluations
        .get_for_session(&session.id)
        .await
        .into_api_error("Failed to fetch evaluation")?;

    let mut value = serde_json::to_value(&session).into_api_error("Failed to encode session")?;
    value["message_count"] = json!(message_count);
    value["evaluation"] =
        serde_json::to_value(&evaluation).into_api_error("Failed to encode evaluation")?;

    Ok(Json(value))
}

/// POST /sessions/{id}/validate
///
/// Idempotent and overwrite-only: each run replaces the stored flags and
/// resulting status. Blocking errors send the session back to draft;
/// otherwise it becomes eligible to simulate.
pub async fn validate_session(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_user(&app, &headers).await?;

    let session = fetch_session(&app, &id).await?;

    let flags = run_checks(&session.system_prompt, session.context_data.as_deref());
    let has_errors = has_blocking_errors(&flags);
    let new_status = if has_errors { SessionStatus::Draft } else { SessionStatus::Validated };

    app.sessions
        .save_validation(&session.id, &flags, new_status)
        .await
        .into_api_error("Failed to save validation results")?;

    Ok(Json(json!({
        "flags": flags,
        "status": new_status,
        "hasErrors": has_errors,
    })))
}

/// POST /sessions/{id}/chat
///
/// One simulated exchange: the model replies under the compiled prompt, then
/// both turns are persisted. The first successful turn moves a draft into
/// `simulating`.
pub async fn chat_turn(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<ChatPayload>,
) -> ApiResult<impl IntoResponse> {
    require_user(&app, &headers).await?;

    let message = payload
        .message
        .as_deref()
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::bad_request("Message is required"))?;

    let session = fetch_session(&app, &id).await?;

    if !session.status.accepts_chat() {
        return Err(ApiError::unprocessable_entity(
            "This session is already being evaluated and no longer accepts messages",
        ));
    }

    // A draft may only advance once the validator stops reporting blocking
    // errors; run it here so the guard cannot be bypassed by skipping the
    // validate endpoint.
    if session.status == SessionStatus::Draft {
        let flags = run_checks(&session.system_prompt, session.context_data.as_deref());
        if has_blocking_errors(&flags) {
            app.sessions
                .save_validation(&session.id, &flags, SessionStatus::Draft)
                .await
                .into_api_error("Failed to save validation results")?;
            return Err(ApiError::unprocessable_entity(
                "Your prompt has validation errors that must be fixed before simulating",
            ));
        }
    }

    let history: Vec<_> = app
        .sessions
        .list_messages(&session.id)
        .await
        .into_api_error("Failed to fetch message history")?
        .iter()
        .map(|m| m.as_chat_turn())
        .collect();

    let reply = app
        .model
        .chat(&session.compiled_prompt, &history, message, CONFIG.chat_temperature)
        .await
        .map_err(ApiError::from)?;

    app.sessions
        .append_message(&session.id, MessageRole::User, message)
        .await
        .into_api_error("Failed to save user message")?;
    app.sessions
        .append_message(&session.id, MessageRole::Assistant, &reply)
        .await
        .into_api_error("Failed to save assistant message")?;

    if session.status.can_start_simulation() {
        app.sessions
            .set_status(&session.id, SessionStatus::Simulating)
            .await
            .into_api_error("Failed to update session status")?;
    }

    let message_count = history.len() as i64 + 2;

    Ok(Json(json!({
        "reply": reply,
        "messageCount": message_count,
    })))
}

/// POST /sessions/{id}/evaluate
///
/// Synchronous end-to-end: returns only once the evaluation is persisted (and
/// the session complete) or the call has failed leaving the session safe to
/// retry.
pub async fn evaluate_session(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_user(&app, &headers).await?;

    let session = fetch_session(&app, &id).await?;

    let evaluation = app
        .judge
        .run(&app.sessions, &app.evaluations, &session)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(json!({
        "success": true,
        "session_id": session.id,
        "evaluation": evaluation,
    })))
}

/// GET /sessions/{id}/messages
pub async fn list_messages(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_user(&app, &headers).await?;

    let session = fetch_session(&app, &id).await?;

    let messages = app
        .sessions
        .list_messages(&session.id)
        .await
        .into_api_error("Failed to fetch messages")?;
    let count = messages.len();

    Ok(Json(json!({
        "messages": messages,
        "count": count,
    })))
}

async fn fetch_session(app: &AppState, id: &str) -> ApiResult<Session> {
    app.sessions
        .get(id)
        .await
        .into_api_error("Failed to fetch session")?
        .ok_or_not_found("Session not found")
}
