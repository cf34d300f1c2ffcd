// src/session/store.rs
// Session and message persistence. Timestamps are stored as naive UTC
// DATETIMEs; message order is created_at then id, which is the canonical
// conversation order fed to both the chat model and the judge.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use sqlx::{Row, SqlitePool};
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use super::types::{compile_prompt, Message, MessageRole, Session, SessionStatus};
use crate::validator::ValidationFlag;

#[derive(Clone)]
pub struct SessionStore {
    pub pool: SqlitePool,
}

pub struct NewSession<'a> {
    pub user_id: &'a str,
    pub problem_statement: &'a str,
    pub system_prompt: &'a str,
    pub use_case_prompt: Option<&'a str>,
    pub context_data: Option<&'a str>,
}

impl SessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a session in `draft`, compiling the prompt and assigning the
    /// next attempt number for this (user, problem statement) pair. Attempt
    /// numbers are monotone per pair and never reused, even for abandoned
    /// attempts.
    pub async fn create(&self, new: NewSession<'_>) -> Result<Session> {
        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sessions WHERE user_id = ? AND problem_statement = ?",
        )
        .bind(new.user_id)
        .bind(new.problem_statement)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count prior attempts")?;

        let attempt_number = existing + 1;
        let compiled_prompt =
            compile_prompt(new.system_prompt, new.use_case_prompt, new.context_data);
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let status = SessionStatus::Draft;

        sqlx::query(
            r#"
            INSERT INTO sessions (
                id, user_id, problem_statement, system_prompt, use_case_prompt,
                context_data, compiled_prompt, attempt_number, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(new.user_id)
        .bind(new.problem_statement)
        .bind(new.system_prompt)
        .bind(new.use_case_prompt)
        .bind(new.context_data)
        .bind(&compiled_prompt)
        .bind(attempt_number)
        .bind(status.to_string())
        .bind(created_at.naive_utc())
        .execute(&self.pool)
        .await
        .context("Failed to create session")?;

        Ok(Session {
            id,
            user_id: new.user_id.to_string(),
            problem_statement: new.problem_statement.to_string(),
            system_prompt: new.system_prompt.to_string(),
            use_case_prompt: new.use_case_prompt.map(str::to_string),
            context_data: new.context_data.map(str::to_string),
            compiled_prompt,
            attempt_number,
            validation_flags: None,
            status,
            created_at,
            evaluated_at: None,
            completed_at: None,
        })
    }

    pub async fn get(&self, session_id: &str) -> Result<Option<Session>> {
        let row = sqlx::query("SELECT * FROM sessions WHERE id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch session")?;

        row.map(session_from_row).transpose()
    }

    /// Sessions for one user, most recent first (dashboard listing order).
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Session>> {
        let rows = sqlx::query("SELECT * FROM sessions WHERE user_id = ? ORDER BY created_at DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list sessions")?;

        rows.into_iter().map(session_from_row).collect()
    }

    /// Persist a validation run: flags plus the resulting status. Always
    /// overwrites the prior result, never merges.
    pub async fn save_validation(
        &self,
        session_id: &str,
        flags: &[ValidationFlag],
        status: SessionStatus,
    ) -> Result<()> {
        let flags_json = serde_json::to_string(flags).context("Failed to encode flags")?;

        sqlx::query("UPDATE sessions SET validation_flags = ?, status = ? WHERE id = ?")
            .bind(flags_json)
            .bind(status.to_string())
            .bind(session_id)
            .execute(&self.pool)
            .await
            .context("Failed to save validation results")?;

        Ok(())
    }

    pub async fn set_status(&self, session_id: &str, status: SessionStatus) -> Result<()> {
        sqlx::query("UPDATE sessions SET status = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(session_id)
            .execute(&self.pool)
            .await
            .context("Failed to update session status")?;

        Ok(())
    }

    /// Stamp the start of an evaluation: `evaluating` + evaluated_at.
    pub async fn begin_evaluation(&self, session_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE sessions SET status = ?, evaluated_at = ? WHERE id = ?")
            .bind(SessionStatus::Evaluating.to_string())
            .bind(Utc::now().naive_utc())
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Repair path: mark complete without touching evaluated_at (used when an
    /// Evaluation row already exists but a prior status update was lost).
    pub async fn mark_complete(&self, session_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE sessions SET status = ?, completed_at = ? WHERE id = ?")
            .bind(SessionStatus::Complete.to_string())
            .bind(Utc::now().naive_utc())
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Append one conversation turn. Messages are immutable once written.
    pub async fn append_message(
        &self,
        session_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<Message> {
        let created_at = Utc::now();

        let row = sqlx::query(
            r#"
            INSERT INTO messages (session_id, role, content, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(session_id)
        .bind(role.to_string())
        .bind(content)
        .bind(created_at.naive_utc())
        .fetch_one(&self.pool)
        .await
        .context("Failed to save message")?;

        Ok(Message {
            id: row.get("id"),
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            created_at,
        })
    }

    /// Full conversation in canonical order.
    pub async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_id, role, content, created_at
            FROM messages
            WHERE session_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch messages")?;

        rows.into_iter().map(message_from_row).collect()
    }

    pub async fn count_messages(&self, session_id: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
    }
}

fn session_from_row(row: SqliteRow) -> Result<Session> {
    let status_str: String = row.get("status");
    let status = status_str
        .parse::<SessionStatus>()
        .map_err(|e| anyhow::anyhow!(e))?;

    let flags_json: Option<String> = row.get("validation_flags");
    let validation_flags = flags_json
        .as_deref()
        .map(serde_json::from_str::<Vec<ValidationFlag>>)
        .transpose()
        .context("Corrupt validation_flags column")?;

    Ok(Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        problem_statement: row.get("problem_statement"),
        system_prompt: row.get("system_prompt"),
        use_case_prompt: row.get("use_case_prompt"),
        context_data: row.get("context_data"),
        compiled_prompt: row.get("compiled_prompt"),
        attempt_number: row.get("attempt_number"),
        validation_flags,
        status,
        created_at: datetime_from_naive(row.get("created_at")),
        evaluated_at: row
            .get::<Option<NaiveDateTime>, _>("evaluated_at")
            .map(|naive| Utc.from_utc_datetime(&naive)),
        completed_at: row
            .get::<Option<NaiveDateTime>, _>("completed_at")
            .map(|naive| Utc.from_utc_datetime(&naive)),
    })
}

fn message_from_row(row: SqliteRow) -> Result<Message> {
    let role_str: String = row.get("role");
    let role = role_str.parse::<MessageRole>().map_err(|e| anyhow::anyhow!(e))?;

    Ok(Message {
        id: row.get("id"),
        session_id: row.get("session_id"),
        role,
        content: row.get("content"),
        created_at: datetime_from_naive(row.get("created_at")),
    })
}

fn datetime_from_naive(naive: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&naive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::run_migrations;
    use crate::validator::{run_checks, has_blocking_errors};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup() -> SessionStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory SQLite pool");
        run_migrations(&pool).await.unwrap();

        sqlx::query("INSERT INTO users (id, username, created_at) VALUES ('u1', 'tester', ?)")
            .bind(Utc::now().naive_utc())
            .execute(&pool)
            .await
            .unwrap();

        SessionStore::new(pool)
    }

    fn new_session<'a>(problem: &'a str) -> NewSession<'a> {
        NewSession {
            user_id: "u1",
            problem_statement: problem,
            system_prompt: "You must always be polite and never rude to people.",
            use_case_prompt: None,
            context_data: None,
        }
    }

    #[tokio::test]
    async fn attempt_numbers_are_sequential_per_problem_statement() {
        let store = setup().await;

        let a1 = store.create(new_session("refund flow")).await.unwrap();
        let a2 = store.create(new_session("refund flow")).await.unwrap();
        let a3 = store.create(new_session("refund flow")).await.unwrap();
        assert_eq!((a1.attempt_number, a2.attempt_number, a3.attempt_number), (1, 2, 3));

        // A different problem statement starts its own sequence
        let b1 = store.create(new_session("shipping delay")).await.unwrap();
        assert_eq!(b1.attempt_number, 1);
    }

    #[tokio::test]
    async fn create_compiles_prompt_and_starts_in_draft() {
        let store = setup().await;

        let session = store
            .create(NewSession {
                user_id: "u1",
                problem_statement: "p",
                system_prompt: "sys",
                use_case_prompt: Some("uc"),
                context_data: None,
            })
            .await
            .unwrap();

        assert_eq!(session.status, SessionStatus::Draft);
        assert_eq!(session.compiled_prompt, "sys\n\n---\n\nuc");

        let fetched = store.get(&session.id).await.unwrap().unwrap();
        assert_eq!(fetched.compiled_prompt, session.compiled_prompt);
        assert!(fetched.validation_flags.is_none());
    }

    #[tokio::test]
    async fn validation_results_overwrite_prior_run() {
        let store = setup().await;
        let session = store.create(new_session("p")).await.unwrap();

        let flags = run_checks("Call 415-555-0123", None);
        assert!(has_blocking_errors(&flags));
        store
            .save_validation(&session.id, &flags, SessionStatus::Draft)
            .await
            .unwrap();

        let clean = run_checks(
            "You must always greet the visitor politely and never speculate about things you were not told. Keep answers brief and clear.",
            None,
        );
        assert!(!has_blocking_errors(&clean));
        store
            .save_validation(&session.id, &clean, SessionStatus::Validated)
            .await
            .unwrap();

        let fetched = store.get(&session.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, SessionStatus::Validated);
        let stored = fetched.validation_flags.unwrap();
        assert!(!stored.iter().any(|f| f.id == "V-01"));
    }

    #[tokio::test]
    async fn messages_keep_canonical_order() {
        let store = setup().await;
        let session = store.create(new_session("p")).await.unwrap();

        store.append_message(&session.id, MessageRole::User, "hi").await.unwrap();
        store.append_message(&session.id, MessageRole::Assistant, "hello").await.unwrap();
        store.append_message(&session.id, MessageRole::User, "help me").await.unwrap();

        let messages = store.list_messages(&session.id).await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "hi");
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[2].content, "help me");
        assert_eq!(store.count_messages(&session.id).await.unwrap(), 3);
    }
}
