//! The questionnaire form and the prediction endpoints.

use axum::extract::State;
use axum::response::{Html, Json};
use indexmap::IndexMap;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument};

use crate::data::predictions::{self, NewPrediction};
use crate::model::{HealthMetrics, RiskAssessment, RiskKind};
use crate::state::AppState;
use crate::utils::log_if_slow;
use crate::web::auth::extractors::{ApiUser, AuthUser};
use crate::web::error::{ApiError, ApiErrorCode, PageError, db_error};
use crate::web::extract::{ApiJson, PageForm};
use crate::web::templates;

/// Local wall-clock format stored in `predict.date`.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SLOW_INFERENCE: Duration = Duration::from_millis(250);

/// `GET /home`
pub async fn home(AuthUser(username): AuthUser) -> Html<String> {
    Html(templates::home(&username))
}

fn assess(state: &AppState, metrics: &HealthMetrics) -> Result<RiskAssessment, ApiError> {
    let start = Instant::now();
    let result = state.model.assess(metrics);
    log_if_slow(start, SLOW_INFERENCE, "model inference");
    result.map_err(|e| {
        error!(error = %e, "model inference failed");
        ApiError::new(ApiErrorCode::ModelUnavailable, "Prediction failed")
    })
}

/// Persist one prediction. Returns the new row id and its timestamp.
async fn record(
    state: &AppState,
    username: &str,
    metrics: &HealthMetrics,
    assessment: &RiskAssessment,
) -> Result<(i64, String), ApiError> {
    let date = chrono::Local::now().format(DATE_FORMAT).to_string();
    let risks: IndexMap<String, f64> = assessment
        .risks
        .iter()
        .map(|(kind, value)| (kind.name().to_string(), *value))
        .collect();

    let id = predictions::insert_prediction(
        &state.db_pool,
        &NewPrediction {
            username,
            date: &date,
            input_data: metrics,
            risks: &risks,
            highest_risk: assessment.highest.name(),
        },
    )
    .await
    .map_err(|e| db_error("Saving prediction", e))?;

    info!(
        prediction_id = id,
        username,
        highest_risk = %assessment.highest,
        "prediction stored"
    );
    Ok((id, date))
}

/// `POST /predict`
#[instrument(skip_all)]
pub async fn predict(
    AuthUser(username): AuthUser,
    State(state): State<AppState>,
    PageForm(form): PageForm<IndexMap<String, String>>,
) -> Result<Html<String>, PageError> {
    let metrics = HealthMetrics::from_lookup(|name| form.get(name).map(String::as_str))
        .map_err(|e| ApiError::invalid_input(format!("Invalid input: {e}")))?;
    let assessment = assess(&state, &metrics)?;

    record(&state, &username, &metrics, &assessment).await?;

    Ok(Html(templates::result(&username, &assessment)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResponse {
    pub id: i64,
    pub date: String,
    pub risks: IndexMap<RiskKind, f64>,
    pub highest_risk: RiskKind,
    pub causes: &'static str,
    pub recovery: &'static str,
}

/// `POST /api/predict`
#[instrument(skip_all)]
pub async fn api_predict(
    ApiUser(username): ApiUser,
    State(state): State<AppState>,
    ApiJson(metrics): ApiJson<HealthMetrics>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let assessment = assess(&state, &metrics)?;

    let (id, date) = record(&state, &username, &metrics, &assessment).await?;

    let highest = assessment.highest;
    Ok(Json(PredictionResponse {
        id,
        date,
        risks: assessment.risks,
        highest_risk: highest,
        causes: highest.causes(),
        recovery: highest.recovery(),
    }))
}
