// src/judge/store.rs
// Evaluation persistence. The insert and the owning session's completion are
// one transaction: status is `complete` if and only if an evaluation row
// exists (modulo the repair path for databases written before this held).

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, TimeZone, Utc};
use sqlx::{Row, SqlitePool};
use sqlx::sqlite::SqliteRow;

use super::types::{Evaluation, PromptEfficiency, Verdict};
use crate::session::SessionStatus;

#[derive(Clone)]
pub struct EvaluationStore {
    pub pool: SqlitePool,
}

impl EvaluationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_for_session(&self, session_id: &str) -> Result<Option<Evaluation>> {
        let row = sqlx::query("SELECT * FROM evaluations WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch evaluation")?;

        row.map(evaluation_from_row).transpose()
    }

    /// Insert the verdict and mark the session complete in one transaction.
    pub async fn persist_and_complete(
        &self,
        session_id: &str,
        verdict: &Verdict,
    ) -> Result<Evaluation, sqlx::Error> {
        let created_at = Utc::now();
        let dimension_scores = serde_json::to_string(&verdict.dimension_scores)
            .unwrap_or_else(|_| "{}".to_string());
        let strengths =
            serde_json::to_string(&verdict.strengths).unwrap_or_else(|_| "[]".to_string());
        let improvements =
            serde_json::to_string(&verdict.improvements).unwrap_or_else(|_| "[]".to_string());
        let prompt_efficiency = verdict
            .prompt_efficiency
            .as_ref()
            .and_then(|pe| serde_json::to_string(pe).ok());

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO evaluations (
                session_id, overall_score, dimension_scores, strengths,
                improvements, prompt_efficiency, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(session_id)
        .bind(verdict.overall_score)
        .bind(&dimension_scores)
        .bind(&strengths)
        .bind(&improvements)
        .bind(&prompt_efficiency)
        .bind(created_at.naive_utc())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE sessions SET status = ?, completed_at = ? WHERE id = ?")
            .bind(SessionStatus::Complete.to_string())
            .bind(created_at.naive_utc())
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Evaluation {
            session_id: session_id.to_string(),
            overall_score: verdict.overall_score,
            dimension_scores: verdict.dimension_scores.clone(),
            strengths: verdict.strengths.clone(),
            improvements: verdict.improvements.clone(),
            prompt_efficiency: verdict.prompt_efficiency.clone(),
            created_at,
        })
    }
}

fn evaluation_from_row(row: SqliteRow) -> Result<Evaluation> {
    let dimension_json: String = row.get("dimension_scores");
    let strengths_json: String = row.get("strengths");
    let improvements_json: String = row.get("improvements");
    let efficiency_json: Option<String> = row.get("prompt_efficiency");

    let created_at: NaiveDateTime = row.get("created_at");

    Ok(Evaluation {
        session_id: row.get("session_id"),
        overall_score: row.get("overall_score"),
        dimension_scores: serde_json::from_str(&dimension_json)
            .context("Corrupt dimension_scores column")?,
        strengths: serde_json::from_str(&strengths_json).context("Corrupt strengths column")?,
        improvements: serde_json::from_str(&improvements_json)
            .context("Corrupt improvements column")?,
        prompt_efficiency: efficiency_json
            .as_deref()
            .map(serde_json::from_str::<PromptEfficiency>)
            .transpose()
            .context("Corrupt prompt_efficiency column")?,
        created_at: Utc.from_utc_datetime(&created_at),
    })
}
