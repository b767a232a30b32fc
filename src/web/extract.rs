//! Body extractors whose rejections render through [`PageError`] and [`ApiError`].
//!
//! axum's own `Form` and `Json` reject with a `text/plain` 422; these wrappers
//! turn the same failures into a 400 error page or a JSON error body.

use axum::extract::FromRequest;
use axum::extract::rejection::{FormRejection, JsonRejection};
use serde_json::json;
use tracing::debug;

use crate::web::error::{ApiError, PageError};

/// `application/x-www-form-urlencoded` body for HTML routes.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Form), rejection(PageError))]
pub struct PageForm<T>(pub T);

/// JSON body for `/api` routes.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<FormRejection> for PageError {
    fn from(rejection: FormRejection) -> Self {
        debug!(status = %rejection.status(), reason = %rejection.body_text(), "form rejected");
        Self(ApiError::invalid_input(format!(
            "Invalid form data: {}",
            rejection.body_text()
        )))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(status = %rejection.status(), reason = %rejection.body_text(), "JSON body rejected");
        ApiError::invalid_input("Invalid JSON body")
            .with_details(json!({ "reason": rejection.body_text() }))
    }
}
