//! Score progression across repeated attempts.
//!
//! Completed sessions group by exact problem-statement string (case-sensitive,
//! no normalization) into use cases; attempts within a use case are ordered by
//! creation time ascending, and use cases by most-recently-touched first.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use crate::judge::DimensionScore;
use crate::session::SessionStatus;

#[derive(Debug, Clone, Serialize)]
pub struct AttemptSummary {
    pub session_id: String,
    pub attempt_number: i64,
    pub overall_score: i64,
    pub dimension_scores: HashMap<String, DimensionScore>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UseCase {
    pub problem_statement: String,
    pub attempts: Vec<AttemptSummary>,
    pub last_updated: DateTime<Utc>,
}

/// Group completed attempts into use cases.
///
/// Pure over its input; tolerant of unsorted rows. The caller is responsible
/// for only passing attempts that actually carry an evaluation.
pub fn aggregate(completed: Vec<(String, AttemptSummary)>) -> Vec<UseCase> {
    let mut groups: HashMap<String, Vec<AttemptSummary>> = HashMap::new();
    for (problem_statement, attempt) in completed {
        groups.entry(problem_statement).or_default().push(attempt);
    }

    let mut use_cases: Vec<UseCase> = groups
        .into_iter()
        .map(|(problem_statement, mut attempts)| {
            attempts.sort_by_key(|a| a.created_at);
            let last_updated = attempts
                .iter()
                .map(|a| a.created_at)
                .max()
                .unwrap_or_else(Utc::now);
            UseCase { problem_statement, attempts, last_updated }
        })
        .collect();

    use_cases.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
    use_cases
}

/// Load a user's completed, evaluated attempts and aggregate them.
///
/// The inner join silently drops any `complete` session missing its
/// evaluation row; that inconsistency is tolerated, not reported.
pub async fn user_progress(pool: &SqlitePool, user_id: &str) -> Result<Vec<UseCase>> {
    let rows = sqlx::query(
        r#"
        SELECT s.id, s.problem_statement, s.attempt_number, s.created_at,
               e.overall_score, e.dimension_scores
        FROM sessions s
        JOIN evaluations e ON e.session_id = s.id
        WHERE s.user_id = ? AND s.status = ?
        ORDER BY s.created_at ASC
        "#,
    )
    .bind(user_id)
    .bind(SessionStatus::Complete.to_string())
    .fetch_all(pool)
    .await
    .context("Failed to fetch progress")?;

    let completed = rows
        .into_iter()
        .map(|row| {
            let created_at: NaiveDateTime = row.get("created_at");
            let dimension_json: String = row.get("dimension_scores");
            let dimension_scores = serde_json::from_str(&dimension_json)
                .context("Corrupt dimension_scores column")?;

            Ok((
                row.get::<String, _>("problem_statement"),
                AttemptSummary {
                    session_id: row.get("id"),
                    attempt_number: row.get("attempt_number"),
                    overall_score: row.get("overall_score"),
                    dimension_scores,
                    created_at: Utc.from_utc_datetime(&created_at),
                },
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(aggregate(completed))
}
