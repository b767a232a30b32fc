//! Server-side login sessions backing the session cookie.

use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use std::time::Duration;

use crate::data::models::SessionRow;

/// Session ids are 32 characters from nanoid's URL-safe alphabet.
const SESSION_ID_LEN: usize = 32;

/// Create a session for `username` that expires after `ttl`.
pub async fn create(pool: &SqlitePool, username: &str, ttl: Duration) -> Result<SessionRow> {
    let now = Utc::now().timestamp();
    let row = SessionRow {
        id: nanoid::nanoid!(SESSION_ID_LEN),
        username: username.to_owned(),
        created_at: now,
        expires_at: now + ttl.as_secs() as i64,
    };

    sqlx::query(
        "INSERT INTO user_sessions (id, username, created_at, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&row.id)
    .bind(&row.username)
    .bind(row.created_at)
    .bind(row.expires_at)
    .execute(pool)
    .await?;

    Ok(row)
}

/// Look up an unexpired session by id.
pub async fn find_valid(pool: &SqlitePool, id: &str) -> Result<Option<SessionRow>> {
    let row = sqlx::query_as::<_, SessionRow>(
        "SELECT id, username, created_at, expires_at FROM user_sessions \
         WHERE id = ? AND expires_at > ?",
    )
    .bind(id)
    .bind(Utc::now().timestamp())
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn delete(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM user_sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Remove expired sessions. Returns the number deleted.
pub async fn purge_expired(pool: &SqlitePool) -> Result<u64> {
    let done = sqlx::query("DELETE FROM user_sessions WHERE expires_at <= ?")
        .bind(Utc::now().timestamp())
        .execute(pool)
        .await?;
    Ok(done.rows_affected())
}
