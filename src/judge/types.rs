// src/judge/types.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::llm::LlmError;

/// One dimension's result as reported by the judge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionScore {
    pub score: i64,
    pub max: i64,
    pub note: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedundancyFlag {
    None,
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptEfficiency {
    pub total_tokens: i64,
    pub redundancy_flag: RedundancyFlag,
    pub compression_suggestion: String,
}

/// A schema-validated judge verdict, ready to persist.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub overall_score: i64,
    pub dimension_scores: HashMap<String, DimensionScore>,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub prompt_efficiency: Option<PromptEfficiency>,
}

/// The persisted evaluation row: exactly one per session, written once and
/// never updated.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub session_id: String,
    pub overall_score: i64,
    pub dimension_scores: HashMap<String, DimensionScore>,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub prompt_efficiency: Option<PromptEfficiency>,
    pub created_at: DateTime<Utc>,
}

/// Shape violations in the judge's response. These are surfaced distinctly
/// from transport/quota failures: a parse error means the response arrived but
/// cannot be trusted, so nothing is persisted.
#[derive(Debug, Error)]
pub enum JudgeParseError {
    #[error("judge response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("judge response is missing dimension '{0}'")]
    MissingDimension(String),

    #[error("dimension '{key}' score {score} is outside 0..={max}")]
    ScoreOutOfRange { key: String, score: i64, max: i64 },

    #[error("dimension '{key}' declares max {declared}, rubric requires {expected}")]
    MaxMismatch { key: String, declared: i64, expected: i64 },

    #[error("overall score {0} is outside 0..=100")]
    OverallOutOfRange(i64),
}

/// Everything that can go wrong while evaluating a session. The HTTP layer
/// maps each variant to a distinct status; callers never see a default score.
#[derive(Debug, Error)]
pub enum EvaluateError {
    #[error("Minimum of {min} exchanged messages required before evaluation (found {found})")]
    TooFewMessages { found: i64, min: i64 },

    #[error("Session has already been evaluated")]
    AlreadyComplete,

    #[error(transparent)]
    Model(#[from] LlmError),

    #[error(transparent)]
    Parse(#[from] JudgeParseError),

    #[error("storage error: {0}")]
    Db(anyhow::Error),
}

impl From<sqlx::Error> for EvaluateError {
    fn from(e: sqlx::Error) -> Self {
        EvaluateError::Db(e.into())
    }
}

impl From<anyhow::Error> for EvaluateError {
    fn from(e: anyhow::Error) -> Self {
        EvaluateError::Db(e)
    }
}
