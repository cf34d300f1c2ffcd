// tests/common/mod.rs
// Shared fixtures: in-memory database setup and canned generative models.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;

use nudgeable::db::run_migrations;
use nudgeable::judge::RUBRIC_V1;
use nudgeable::llm::{ChatTurn, GenerativeModel, LlmError};
use nudgeable::state::{create_app_state, AppState};

/// Model stub returning fixed replies for both call shapes.
pub struct StubModel {
    pub chat_reply: String,
    pub json_reply: String,
}

impl StubModel {
    pub fn with_json(json_reply: impl Into<String>) -> Self {
        Self {
            chat_reply: "Happy to help! Could you share your order number?".to_string(),
            json_reply: json_reply.into(),
        }
    }
}

#[async_trait]
impl GenerativeModel for StubModel {
    async fn chat(
        &self,
        _system: &str,
        _history: &[ChatTurn],
        _message: &str,
        _temperature: f32,
    ) -> Result<String, LlmError> {
        Ok(self.chat_reply.clone())
    }

    async fn generate_json(&self, _system: &str, _content: &str) -> Result<String, LlmError> {
        Ok(self.json_reply.clone())
    }
}

/// Model stub whose judge call always fails with a quota error.
pub struct QuotaExhaustedModel;

#[async_trait]
impl GenerativeModel for QuotaExhaustedModel {
    async fn chat(
        &self,
        _system: &str,
        _history: &[ChatTurn],
        _message: &str,
        _temperature: f32,
    ) -> Result<String, LlmError> {
        Err(LlmError::QuotaExhausted("RESOURCE_EXHAUSTED".to_string()))
    }

    async fn generate_json(&self, _system: &str, _content: &str) -> Result<String, LlmError> {
        Err(LlmError::QuotaExhausted("RESOURCE_EXHAUSTED".to_string()))
    }
}

/// A rubric-conformant judge response: every dimension at 8/10 except
/// `examples`, with the weighted overall precomputed by the caller.
pub fn conformant_judge_json(overall: i64, examples_score: i64) -> String {
    let mut dims = serde_json::Map::new();
    for dim in RUBRIC_V1.dimensions {
        let score = if dim.key == "examples" { examples_score } else { 8 };
        dims.insert(
            dim.key.to_string(),
            json!({"score": score, "max": dim.max, "note": "solid"}),
        );
    }
    json!({
        "overall_score": overall,
        "dimension_scores": dims,
        "strengths": ["Clear role definition", "Good guardrails"],
        "improvements": ["Add few-shot examples"],
        "prompt_efficiency": {
            "total_tokens": 180,
            "redundancy_flag": "none",
            "compression_suggestion": "Nothing significant to trim."
        }
    })
    .to_string()
}

/// Fresh in-memory application state around the given model.
pub async fn test_state(model: Arc<dyn GenerativeModel>) -> AppState {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");
    run_migrations(&pool).await.expect("migrations");

    create_app_state(pool, model)
}
