//! Anonymous feedback form.

use axum::extract::State;
use axum::response::Html;
use tracing::info;

use crate::data::feedback;
use crate::data::models::NewFeedback;
use crate::state::AppState;
use crate::web::auth::extractors::MaybeUser;
use crate::web::error::{ApiError, PageError, db_error};
use crate::web::extract::PageForm;
use crate::web::templates;

/// `GET /feedback`
pub async fn feedback_form(MaybeUser(user): MaybeUser) -> Html<String> {
    Html(templates::feedback(user.as_deref(), false))
}

/// `POST /feedback`
pub async fn submit_feedback(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
    PageForm(form): PageForm<NewFeedback>,
) -> Result<Html<String>, PageError> {
    if !(1..=5).contains(&form.rating) {
        return Err(ApiError::invalid_input("Rating must be between 1 and 5.").into());
    }

    info!(
        name = %form.name,
        email = %form.email,
        rating = form.rating,
        message = %form.message,
        "feedback received"
    );
    let id = feedback::insert_feedback(&state.db_pool, &form)
        .await
        .map_err(|e| db_error("Saving feedback", e))?;
    info!(feedback_id = id, "feedback stored");

    Ok(Html(templates::feedback(user.as_deref(), true)))
}
