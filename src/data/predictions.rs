//! Prediction history (`predict` table).

use anyhow::Result;
use indexmap::IndexMap;
use sqlx::SqlitePool;
use sqlx::types::Json;

use crate::data::models::Prediction;
use crate::model::HealthMetrics;

const PREDICTION_SELECT: &str =
    "SELECT id, username, date, input_data, risks, highest_risk FROM predict";

/// Values for a new `predict` row.
#[derive(Debug, Clone)]
pub struct NewPrediction<'a> {
    pub username: &'a str,
    pub date: &'a str,
    /// Stored as JSON in questionnaire field order.
    pub input_data: &'a HealthMetrics,
    pub risks: &'a IndexMap<String, f64>,
    pub highest_risk: &'a str,
}

/// Insert a prediction and return its id.
pub async fn insert_prediction(pool: &SqlitePool, new: &NewPrediction<'_>) -> Result<i64> {
    let done = sqlx::query(
        "INSERT INTO predict (username, date, input_data, risks, highest_risk) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(new.username)
    .bind(new.date)
    .bind(Json(new.input_data))
    .bind(Json(new.risks))
    .bind(new.highest_risk)
    .execute(pool)
    .await?;
    Ok(done.last_insert_rowid())
}

/// All predictions for one user, oldest first.
pub async fn list_for_user(pool: &SqlitePool, username: &str) -> Result<Vec<Prediction>> {
    let rows = sqlx::query_as::<_, Prediction>(&format!(
        "{PREDICTION_SELECT} WHERE username = ? ORDER BY id"
    ))
    .bind(username)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Every stored prediction, oldest first.
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Prediction>> {
    let rows = sqlx::query_as::<_, Prediction>(&format!("{PREDICTION_SELECT} ORDER BY id"))
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Delete one of `username`'s predictions. Returns `false` when no row with
/// that id belongs to the user.
pub async fn delete_for_user(pool: &SqlitePool, id: i64, username: &str) -> Result<bool> {
    let done = sqlx::query("DELETE FROM predict WHERE id = ? AND username = ?")
        .bind(id)
        .bind(username)
        .execute(pool)
        .await?;
    Ok(done.rows_affected() > 0)
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM predict")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
