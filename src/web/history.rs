//! Prediction history for the logged-in user.

use axum::extract::{Path, State};
use axum::response::{Html, Json};
use serde_json::{Value, json};
use tracing::info;

use crate::data::predictions;
use crate::state::AppState;
use crate::web::auth::extractors::{ApiUser, AuthUser};
use crate::web::error::{ApiError, PageError, db_error};
use crate::web::templates;

/// `GET /history`
pub async fn history(
    AuthUser(username): AuthUser,
    State(state): State<AppState>,
) -> Result<Html<String>, PageError> {
    let rows = predictions::list_for_user(&state.db_pool, &username)
        .await
        .map_err(|e| db_error("Loading history", e))?;
    Ok(Html(templates::history(&username, &rows)))
}

/// `DELETE /delete-history/{id}`
///
/// Only the owner's rows can be deleted; anything else is reported as not found.
pub async fn delete_history(
    ApiUser(username): ApiUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let deleted = predictions::delete_for_user(&state.db_pool, id, &username)
        .await
        .map_err(|e| db_error("Deleting prediction", e))?;

    if !deleted {
        return Err(ApiError::not_found(format!("Prediction {id} not found")));
    }
    info!(prediction_id = id, username, "prediction deleted");
    Ok(Json(json!({ "status": "success" })))
}
