//! Database pool configuration and schema setup.
//!
//! Schema lives in code as idempotent statements so the same setup path
//! serves both the server (file-backed database) and tests (`sqlite::memory:`).

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Executor;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Create an optimized SQLite connection pool
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| anyhow::anyhow!("Invalid database URL '{database_url}': {e}"))?
        .create_if_missing(true);

    SqlitePoolOptions::new()
        // SQLite is single-writer, but can have multiple readers
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))
}

const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    created_at DATETIME NOT NULL
);
"#;

const CREATE_SESSIONS: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    problem_statement TEXT NOT NULL,
    system_prompt TEXT NOT NULL,
    use_case_prompt TEXT,
    context_data TEXT,
    compiled_prompt TEXT NOT NULL,
    attempt_number INTEGER NOT NULL,
    validation_flags TEXT,
    status TEXT NOT NULL,
    created_at DATETIME NOT NULL,
    evaluated_at DATETIME,
    completed_at DATETIME,
    FOREIGN KEY (user_id) REFERENCES users(id)
);
"#;

const CREATE_MESSAGES: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
    content TEXT NOT NULL,
    created_at DATETIME NOT NULL,
    FOREIGN KEY (session_id) REFERENCES sessions(id)
);
"#;

const CREATE_EVALUATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS evaluations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL UNIQUE,
    overall_score INTEGER NOT NULL CHECK (overall_score >= 0 AND overall_score <= 100),
    dimension_scores TEXT NOT NULL,
    strengths TEXT NOT NULL,
    improvements TEXT NOT NULL,
    prompt_efficiency TEXT,
    created_at DATETIME NOT NULL,
    FOREIGN KEY (session_id) REFERENCES sessions(id)
);
"#;

const CREATE_INDICES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
CREATE INDEX IF NOT EXISTS idx_sessions_user_problem ON sessions(user_id, problem_statement);
CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id, created_at);
CREATE INDEX IF NOT EXISTS idx_evaluations_session ON evaluations(session_id);
"#;

/// Runs all required schema statements. Safe to call at every startup (idempotent).
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    pool.execute(CREATE_USERS).await?;
    pool.execute(CREATE_SESSIONS).await?;
    pool.execute(CREATE_MESSAGES).await?;
    pool.execute(CREATE_EVALUATIONS).await?;
    pool.execute(CREATE_INDICES).await?;

    info!("Database schema ready");
    Ok(())
}
