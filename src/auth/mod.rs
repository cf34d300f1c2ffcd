//! Authentication boundary.
//!
//! Credentials come from a static `USERS` env list and the verified username
//! rides in an HttpOnly cookie; the core only depends on "an authenticated
//! username is available or the request is rejected". User rows are created
//! lazily on first successful login.

use anyhow::{Context, Result};
use axum::http::{header, HeaderMap};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "nudgeable_session";

/// Seven days, in seconds
pub const COOKIE_MAX_AGE: u64 = 60 * 60 * 24 * 7;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Extract the authenticated username from the request's session cookie.
pub fn username_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;

    cookie_header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}

/// Check a username/password pair against the configured credential list
/// ("alice:secret,bob:hunter2").
pub fn verify_credentials(users_env: &str, username: &str, password: &str) -> bool {
    users_env.split(',').any(|pair| {
        match pair.split_once(':') {
            Some((u, p)) => u.trim() == username && p.trim() == password,
            None => false,
        }
    })
}

#[derive(Clone)]
pub struct UserStore {
    pub pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch the user row for a verified username, creating it on first login.
    pub async fn get_or_create(&self, username: &str) -> Result<User> {
        let existing = sqlx::query("SELECT id, username, created_at FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to look up user")?;

        if let Some(row) = existing {
            let created_at: NaiveDateTime = row.get("created_at");
            return Ok(User {
                id: row.get("id"),
                username: row.get("username"),
                created_at: Utc.from_utc_datetime(&created_at),
            });
        }

        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();

        sqlx::query("INSERT INTO users (id, username, created_at) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(username)
            .bind(created_at.naive_utc())
            .execute(&self.pool)
            .await
            .context("Failed to create user")?;

        Ok(User { id, username: username.to_string(), created_at })
    }
}
