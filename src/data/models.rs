//! Row types shared by the query modules and handlers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

/// A stored prediction with its JSON columns decoded.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Prediction {
    pub id: i64,
    pub username: String,
    /// Local time, `YYYY-MM-DD HH:MM:SS`.
    pub date: String,
    /// The validated questionnaire, keyed by field name.
    pub input_data: Json<IndexMap<String, serde_json::Value>>,
    /// Risk name to rounded percentage, in model output order.
    pub risks: Json<IndexMap<String, f64>>,
    pub highest_risk: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub full_name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    /// File name inside the upload directory.
    pub photo: Option<String>,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct SessionRow {
    pub id: String,
    pub username: String,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds.
    pub expires_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFeedback {
    pub name: String,
    pub email: String,
    pub rating: i64,
    pub message: String,
}
