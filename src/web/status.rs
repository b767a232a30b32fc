//! Health and status handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{trace, warn};

use crate::data::{health as db_health, predictions, users};
use crate::model::ModelSummary;
use crate::state::AppState;
use crate::utils::fmt_duration;
use crate::web::error::{ApiError, db_error};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    version: &'static str,
    commit: &'static str,
    uptime: String,
    model: ModelSummary,
    users: i64,
    predictions: i64,
}

/// `GET /api/health`
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    trace!("health check requested");
    let timestamp = chrono::Utc::now().to_rfc3339();
    match db_health::ping(&state.db_pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "database": "ok", "timestamp": timestamp })),
        ),
        Err(e) => {
            warn!(error = ?e, "database ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "database": "error", "timestamp": timestamp })),
            )
        }
    }
}

/// `GET /api/status`
pub async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let users = users::count_users(&state.db_pool)
        .await
        .map_err(|e| db_error("Counting users", e))?;
    let predictions = predictions::count(&state.db_pool)
        .await
        .map_err(|e| db_error("Counting predictions", e))?;

    Ok(Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: env!("GIT_COMMIT_HASH"),
        uptime: fmt_duration(state.started_at.elapsed()),
        model: state.model.summary(),
        users,
        predictions,
    }))
}
