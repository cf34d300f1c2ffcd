//! Generative model boundary.
//!
//! The platform consumes exactly two call shapes: multi-turn chat (the
//! simulated customer conversation) and single-shot JSON generation (the
//! judge). Both sit behind [`GenerativeModel`] so tests can substitute a
//! canned model.

pub mod gemini;

use async_trait::async_trait;
use thiserror::Error;

pub use gemini::GeminiClient;

/// One prior turn of a simulated conversation, in stored order.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// Errors from the model boundary.
///
/// Quota exhaustion is classified separately because it is retryable after a
/// delay and must never be conflated with a malformed response.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("model API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model returned an empty response")]
    EmptyResponse,
}

impl LlmError {
    /// True for failures where retrying the identical request later can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::QuotaExhausted(_) | LlmError::Transport(_))
    }
}

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Multi-turn chat: prior history plus one new user message, with the
    /// compiled prompt as system instruction. Returns the assistant reply.
    async fn chat(
        &self,
        system: &str,
        history: &[ChatTurn],
        message: &str,
        temperature: f32,
    ) -> Result<String, LlmError>;

    /// Single-shot structured generation: system instruction (the rubric) plus
    /// one content string, requesting JSON output. Returns the raw text, which
    /// callers must still defensively unwrap and parse.
    async fn generate_json(&self, system: &str, content: &str) -> Result<String, LlmError>;
}
