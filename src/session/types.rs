// src/session/types.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::llm::{ChatRole, ChatTurn};
use crate::validator::ValidationFlag;

/// Separator between the parts of a compiled prompt
pub const PROMPT_SEPARATOR: &str = "\n\n---\n\n";

/// Lifecycle of one prompt-development attempt.
///
/// `draft → (validated) → simulating → evaluating → complete`. Complete is
/// terminal. A failed model call or judge parse leaves the session in
/// `evaluating` so the evaluation can be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Draft,
    Validated,
    Simulating,
    Evaluating,
    Complete,
}

impl SessionStatus {
    /// Statuses from which a first chat turn may start a simulation
    pub fn can_start_simulation(&self) -> bool {
        matches!(self, SessionStatus::Draft | SessionStatus::Validated)
    }

    /// Chat turns are only meaningful before the transcript is judged
    pub fn accepts_chat(&self) -> bool {
        !matches!(self, SessionStatus::Evaluating | SessionStatus::Complete)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Draft => "draft",
            SessionStatus::Validated => "validated",
            SessionStatus::Simulating => "simulating",
            SessionStatus::Evaluating => "evaluating",
            SessionStatus::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(SessionStatus::Draft),
            "validated" => Ok(SessionStatus::Validated),
            "simulating" => Ok(SessionStatus::Simulating),
            "evaluating" => Ok(SessionStatus::Evaluating),
            "complete" => Ok(SessionStatus::Complete),
            other => Err(format!("unknown session status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub problem_statement: String,
    pub system_prompt: String,
    pub use_case_prompt: Option<String>,
    pub context_data: Option<String>,
    pub compiled_prompt: String,
    pub attempt_number: i64,
    pub validation_flags: Option<Vec<ValidationFlag>>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("unknown message role '{other}'")),
        }
    }
}

/// One turn of a simulated conversation. Immutable once written; canonical
/// order is creation time ascending (id breaks ties).
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: i64,
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn as_chat_turn(&self) -> ChatTurn {
        ChatTurn {
            role: match self.role {
                MessageRole::User => ChatRole::User,
                MessageRole::Assistant => ChatRole::Assistant,
            },
            content: self.content.clone(),
        }
    }
}

/// Deterministic concatenation of the prompt parts, skipping empty ones.
pub fn compile_prompt(
    system_prompt: &str,
    use_case_prompt: Option<&str>,
    context_data: Option<&str>,
) -> String {
    [Some(system_prompt), use_case_prompt, context_data]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(PROMPT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_joins_all_parts() {
        let compiled = compile_prompt("sys", Some("use case"), Some("ctx"));
        assert_eq!(compiled, "sys\n\n---\n\nuse case\n\n---\n\nctx");
    }

    #[test]
    fn compile_skips_empty_parts() {
        assert_eq!(compile_prompt("sys", None, Some("ctx")), "sys\n\n---\n\nctx");
        assert_eq!(compile_prompt("sys", Some(""), None), "sys");
    }

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in [
            SessionStatus::Draft,
            SessionStatus::Validated,
            SessionStatus::Simulating,
            SessionStatus::Evaluating,
            SessionStatus::Complete,
        ] {
            assert_eq!(status.to_string().parse::<SessionStatus>().unwrap(), status);
        }
    }

    #[test]
    fn chat_guards_follow_lifecycle() {
        assert!(SessionStatus::Draft.can_start_simulation());
        assert!(SessionStatus::Validated.can_start_simulation());
        assert!(!SessionStatus::Simulating.can_start_simulation());

        assert!(SessionStatus::Simulating.accepts_chat());
        assert!(!SessionStatus::Evaluating.accepts_chat());
        assert!(!SessionStatus::Complete.accepts_chat());
    }
}
