// src/api/error.rs
// Centralized error handling for HTTP API responses. The core surfaces typed
// errors; this is the one place they become status codes and display text.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use tracing::error;

use crate::judge::{EvaluateError, JudgeParseError};
use crate::llm::LlmError;

/// Standard API error response format
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status_code: StatusCode,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self { message: message.into(), status_code: StatusCode::INTERNAL_SERVER_ERROR }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { message: message.into(), status_code: StatusCode::BAD_REQUEST }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self { message: message.into(), status_code: StatusCode::NOT_FOUND }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self { message: message.into(), status_code: StatusCode::UNAUTHORIZED }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self { message: message.into(), status_code: StatusCode::CONFLICT }
    }

    pub fn unprocessable_entity(message: impl Into<String>) -> Self {
        Self { message: message.into(), status_code: StatusCode::UNPROCESSABLE_ENTITY }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.message,
            "status": self.status_code.as_u16(),
        });
        (self.status_code, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Extension trait for converting fallible operations to ApiError
pub trait IntoApiError<T> {
    fn into_api_error(self, message: &str) -> Result<T, ApiError>;
}

impl<T, E> IntoApiError<T> for Result<T, E>
where
    E: std::fmt::Debug,
{
    fn into_api_error(self, message: &str) -> Result<T, ApiError> {
        self.map_err(|e| {
            error!("{}: {:?}", message, e);
            ApiError::internal(message)
        })
    }
}

/// Extension trait for Option<T> to create ApiError for None cases
pub trait IntoApiErrorOption<T> {
    fn ok_or_not_found(self, message: &str) -> Result<T, ApiError>;
}

impl<T> IntoApiErrorOption<T> for Option<T> {
    fn ok_or_not_found(self, message: &str) -> Result<T, ApiError> {
        self.ok_or_else(|| ApiError::not_found(message))
    }
}

// Error taxonomy mapping: guard violations, quota exhaustion, judge parse
// failures, and store errors each get a distinct status so clients can react
// (retry, wait, or fix input) without string-matching messages.

impl From<LlmError> for ApiError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::QuotaExhausted(_) => Self {
                message: "API quota exceeded. Please wait a moment and try again, or the daily limit may have been reached.".to_string(),
                status_code: StatusCode::TOO_MANY_REQUESTS,
            },
            other => {
                error!("model call failed: {other}");
                Self {
                    message: "An error occurred during the model call. Please try again.".to_string(),
                    status_code: StatusCode::BAD_GATEWAY,
                }
            }
        }
    }
}

impl From<EvaluateError> for ApiError {
    fn from(e: EvaluateError) -> Self {
        match e {
            EvaluateError::TooFewMessages { .. } => ApiError::bad_request(e.to_string()),
            EvaluateError::AlreadyComplete => ApiError::conflict(e.to_string()),
            EvaluateError::Model(model_err) => model_err.into(),
            EvaluateError::Parse(parse_err) => {
                error!("judge response rejected: {parse_err}");
                Self {
                    message: "The evaluation response could not be interpreted. The session is still open for retry.".to_string(),
                    status_code: StatusCode::BAD_GATEWAY,
                }
            }
            EvaluateError::Db(db_err) => {
                error!("evaluation storage error: {db_err:?}");
                ApiError::internal("Failed to persist evaluation")
            }
        }
    }
}

impl From<JudgeParseError> for ApiError {
    fn from(e: JudgeParseError) -> Self {
        ApiError::from(EvaluateError::Parse(e))
    }
}
