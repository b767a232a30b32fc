//! Extractors that resolve the logged-in user from the session cookie.

use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Redirect, Response};
use http::request::Parts;

use crate::state::AppState;
use crate::web::auth::session::session_id;
use crate::web::error::{ApiError, PageError, db_error};

async fn current_user(parts: &Parts, state: &AppState) -> Result<Option<String>, ApiError> {
    let Some(id) = session_id(&parts.headers) else {
        return Ok(None);
    };
    state
        .sessions
        .resolve(&id)
        .await
        .map_err(|e| db_error("Session lookup", e))
}

/// Logged-in user for HTML pages. Anonymous visitors are redirected to `/`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match current_user(parts, state).await {
            Ok(Some(username)) => Ok(AuthUser(username)),
            Ok(None) => Err(Redirect::to("/").into_response()),
            Err(e) => Err(PageError(e).into_response()),
        }
    }
}

/// Logged-in user for JSON endpoints. Anonymous callers get a 401.
#[derive(Debug, Clone)]
pub struct ApiUser(pub String);

impl FromRequestParts<AppState> for ApiUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        current_user(parts, state)
            .await?
            .map(ApiUser)
            .ok_or_else(|| ApiError::unauthorized("Login required"))
    }
}

/// The user if logged in, without rejecting anonymous visitors.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<String>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        current_user(parts, state)
            .await
            .map(MaybeUser)
            .map_err(|e| PageError(e).into_response())
    }
}
