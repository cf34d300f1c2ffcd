//! LLM-judged evaluation of a finished simulation.
//!
//! The judge protocol turns a stored conversation transcript into a
//! structured, weighted, multi-dimension score: render the transcript, send
//! it to the model with the rubric as operating instructions, then strictly
//! parse and validate the JSON that comes back. A response that fails any
//! shape check persists nothing and leaves the session in `evaluating` so the
//! call can be retried.

pub mod rubric;
pub mod store;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

pub use rubric::{Rubric, RUBRIC_V1};
pub use store::EvaluationStore;
pub use types::{
    DimensionScore, EvaluateError, Evaluation, JudgeParseError, PromptEfficiency, Verdict,
};

use crate::llm::GenerativeModel;
use crate::session::{Message, Session, SessionStatus, SessionStore};

/// 3 full exchanges (3 user + 3 assistant turns) before a transcript is
/// considered judgeable.
pub const MIN_EVAL_MESSAGES: i64 = 6;

pub struct Judge {
    model: Arc<dyn GenerativeModel>,
    rubric: &'static Rubric,
}

impl Judge {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model, rubric: &RUBRIC_V1 }
    }

    pub fn rubric(&self) -> &'static Rubric {
        self.rubric
    }

    /// Run the full evaluation lifecycle for one session: guards, status
    /// stamps, model call, parse, persistence. Exactly one evaluation per
    /// session; a session already holding one is repaired to `complete` and
    /// its stored verdict returned without re-running the judge.
    pub async fn run(
        &self,
        sessions: &SessionStore,
        evaluations: &EvaluationStore,
        session: &Session,
    ) -> Result<Evaluation, EvaluateError> {
        if session.status == SessionStatus::Complete {
            return Err(EvaluateError::AlreadyComplete);
        }

        if let Some(existing) = evaluations.get_for_session(&session.id).await? {
            // Partial-failure residue: the evaluation row landed but the
            // status update was lost. The row is authoritative.
            warn!(session_id = %session.id, "evaluation already exists, repairing status");
            sessions.mark_complete(&session.id).await?;
            return Ok(existing);
        }

        let message_count = sessions.count_messages(&session.id).await?;
        if message_count < MIN_EVAL_MESSAGES {
            return Err(EvaluateError::TooFewMessages {
                found: message_count,
                min: MIN_EVAL_MESSAGES,
            });
        }

        sessions.begin_evaluation(&session.id).await?;

        let messages = sessions.list_messages(&session.id).await?;

        let verdict = self.evaluate(session, &messages).await?;

        let evaluation = evaluations.persist_and_complete(&session.id, &verdict).await?;
        info!(
            session_id = %session.id,
            overall = evaluation.overall_score,
            "evaluation complete"
        );

        Ok(evaluation)
    }

    /// The protocol itself, free of persistence: build the request, call the
    /// model, parse and validate the verdict.
    pub async fn evaluate(
        &self,
        session: &Session,
        messages: &[Message],
    ) -> Result<Verdict, EvaluateError> {
        let request = build_request(session, messages);
        let raw = self.model.generate_json(&self.rubric.instruction(), &request).await?;
        let verdict = parse_verdict(self.rubric, &raw)?;

        let recomputed = self.rubric.weighted_overall(&verdict.dimension_scores);
        if recomputed != verdict.overall_score {
            // QA flag only: the reported value is what gets stored.
            warn!(
                session_id = %session.id,
                reported = verdict.overall_score,
                recomputed,
                "judge overall score disagrees with weighted formula"
            );
        }

        Ok(verdict)
    }
}

/// Render the conversation as `ROLE: content` blocks in canonical order.
pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.to_string().to_uppercase(), m.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn build_request(session: &Session, messages: &[Message]) -> String {
    format!(
        "PROBLEM STATEMENT:\n{problem}\n\n\
         SYSTEM PROMPT UNDER EVALUATION:\n{prompt}\n\n\
         CONVERSATION ({count} messages):\n\n{transcript}",
        problem = session.problem_statement,
        prompt = session.compiled_prompt,
        count = messages.len(),
        transcript = render_transcript(messages),
    )
}

/// Models sometimes wrap JSON in markdown fences despite instructions not to.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").or_else(|| rest.strip_prefix("JSON")).unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Wire shape of the judge response, before rubric validation.
#[derive(serde::Deserialize)]
struct RawVerdict {
    overall_score: i64,
    dimension_scores: HashMap<String, DimensionScore>,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    improvements: Vec<String>,
    #[serde(default)]
    prompt_efficiency: Option<PromptEfficiency>,
}

/// Parse and validate a raw judge response against the rubric.
///
/// Every rubric-declared dimension must be present with an integer score in
/// 0..=max and a max matching the rubric's; the overall score must be an
/// integer 0..=100. Extra keys the rubric does not declare are ignored.
pub fn parse_verdict(rubric: &Rubric, raw: &str) -> Result<Verdict, JudgeParseError> {
    let raw_verdict: RawVerdict = serde_json::from_str(strip_code_fences(raw))?;

    for dim in rubric.dimensions {
        let reported = raw_verdict
            .dimension_scores
            .get(dim.key)
            .ok_or_else(|| JudgeParseError::MissingDimension(dim.key.to_string()))?;

        if reported.max != dim.max {
            return Err(JudgeParseError::MaxMismatch {
                key: dim.key.to_string(),
                declared: reported.max,
                expected: dim.max,
            });
        }

        if reported.score < 0 || reported.score > dim.max {
            return Err(JudgeParseError::ScoreOutOfRange {
                key: dim.key.to_string(),
                score: reported.score,
                max: dim.max,
            });
        }
    }

    if raw_verdict.overall_score < 0 || raw_verdict.overall_score > 100 {
        return Err(JudgeParseError::OverallOutOfRange(raw_verdict.overall_score));
    }

    Ok(Verdict {
        overall_score: raw_verdict.overall_score,
        dimension_scores: raw_verdict.dimension_scores,
        strengths: raw_verdict.strengths,
        improvements: raw_verdict.improvements,
        prompt_efficiency: raw_verdict.prompt_efficiency,
    })
}
