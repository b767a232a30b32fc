//! Account registration, login and logout.

pub mod extractors;
pub mod password;
pub mod session;

use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::data::users::{self, CreateUserError};
use crate::state::AppState;
use crate::web::auth::extractors::MaybeUser;
use crate::web::error::{ApiError, PageError, db_error};
use crate::web::extract::PageForm;
use crate::web::templates;

const MAX_USERNAME_LEN: usize = 64;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    fn validate(&self) -> Result<&str, ApiError> {
        let username = self.username.trim();
        if username.is_empty() || self.password.is_empty() {
            return Err(ApiError::invalid_input("Username and password are required."));
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(ApiError::invalid_input(format!(
                "Username must be at most {MAX_USERNAME_LEN} characters."
            )));
        }
        Ok(username)
    }
}

#[derive(Debug, Deserialize)]
pub struct LandingQuery {
    success: Option<String>,
}

/// `GET /`
pub async fn landing(MaybeUser(user): MaybeUser, Query(query): Query<LandingQuery>) -> Html<String> {
    let registered = query.success.as_deref() == Some("1");
    Html(templates::landing(user.as_deref(), registered))
}

/// `POST /register`
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    PageForm(form): PageForm<Credentials>,
) -> Result<Redirect, PageError> {
    let username = form.validate()?;

    let hash = password::hash_blocking(form.password.clone())
        .await
        .map_err(|e| ApiError::internal_error(format!("Password hashing failed: {e}")))?;

    match users::create_user(&state.db_pool, username, &hash).await {
        Ok(id) => {
            info!(user_id = id, username, "user registered");
            Ok(Redirect::to("/?success=1"))
        }
        Err(CreateUserError::Duplicate) => {
            info!(username, "registration rejected, username taken");
            Err(ApiError::conflict("Username already exists.").into())
        }
        Err(CreateUserError::Database(e)) => Err(db_error("User registration", e.into()).into()),
    }
}

/// `POST /login`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    PageForm(form): PageForm<Credentials>,
) -> Result<Response, PageError> {
    let username = form.validate()?;

    let stored = users::get_password_hash(&state.db_pool, username)
        .await
        .map_err(|e| db_error("User lookup", e))?;

    let verified = password::verify_blocking(form.password.clone(), stored)
        .await
        .map_err(|e| ApiError::internal_error(format!("Password check failed: {e}")))?;
    if !verified {
        warn!(username, "login rejected");
        return Err(ApiError::unauthorized("Invalid credentials").into());
    }

    if let Err(e) = state.sessions.purge_expired().await {
        warn!(error = ?e, "failed to purge expired sessions");
    }

    let settings = &state.settings;
    let session = state
        .sessions
        .create(username, settings.session_ttl)
        .await
        .map_err(|e| db_error("Session creation", e))?;
    info!(username, "user logged in");

    let cookie = session::session_cookie(&session.id, settings.session_ttl, settings.secure_cookies);
    Ok(([(SET_COOKIE, cookie)], Redirect::to("/home")).into_response())
}

/// `GET /logout`
pub async fn logout(State(state): State<AppState>, headers: http::HeaderMap) -> Response {
    if let Some(id) = session::session_id(&headers)
        && let Err(e) = state.sessions.revoke(&id).await
    {
        warn!(error = ?e, "failed to revoke session");
    }

    let cookie = session::clear_session_cookie(state.settings.secure_cookies);
    ([(SET_COOKIE, cookie)], Redirect::to("/")).into_response()
}
