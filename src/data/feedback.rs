//! Visitor feedback submissions.

use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::data::models::NewFeedback;

pub async fn insert_feedback(pool: &SqlitePool, feedback: &NewFeedback) -> Result<i64> {
    let done = sqlx::query(
        "INSERT INTO feedback (name, email, rating, message, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&feedback.name)
    .bind(&feedback.email)
    .bind(feedback.rating)
    .bind(&feedback.message)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(done.last_insert_rowid())
}
