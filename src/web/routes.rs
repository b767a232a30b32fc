//! Router construction.

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;

use crate::state::AppState;
use crate::web::middleware::rate_limit::{RateLimitLayer, RateLimitState};
use crate::web::middleware::request_id::RequestIdLayer;
use crate::web::middleware::security_headers::SecurityHeadersLayer;
use crate::web::{assets, auth, feedback, history, predict, profile, status, templates};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates the web server router
pub fn create_router(app_state: AppState) -> Router {
    let api_router = Router::new()
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .route("/predict", post(predict::api_predict));

    let uploads = ServeDir::new(&app_state.settings.upload_dir);
    let hsts = app_state.settings.secure_cookies;

    let router = Router::new()
        .route("/", get(auth::landing))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/home", get(predict::home))
        .route("/predict", post(predict::predict))
        .route("/history", get(history::history))
        .route("/delete-history/{id}", delete(history::delete_history))
        .route("/profile", get(profile::profile))
        .route(
            "/save_profile",
            post(profile::save_profile).layer(DefaultBodyLimit::max(profile::MAX_PROFILE_UPLOAD)),
        )
        .route(
            "/feedback",
            get(feedback::feedback_form).post(feedback::submit_feedback),
        )
        .route("/static/app.css", get(assets::stylesheet))
        .route("/static/app.js", get(assets::script))
        .nest_service("/static/uploads", uploads)
        .nest("/api", api_router)
        .fallback(not_found)
        .with_state(app_state);

    router.layer((
        // Outermost: per-request ID span + severity-proportional response logging.
        RequestIdLayer,
        SecurityHeadersLayer::new(hsts),
        CompressionLayer::new()
            .br(true)
            .gzip(true)
            .quality(tower_http::CompressionLevel::Fastest),
        TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, REQUEST_TIMEOUT),
        // Innermost so rejections still pass through the layers above.
        RateLimitLayer::new(Arc::new(RateLimitState::new())),
    ))
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(templates::error_page(StatusCode::NOT_FOUND, "Page not found.")),
    )
        .into_response()
}
