//! User profile view and multipart save.

use axum::extract::{Multipart, Query, State};
use axum::response::{Html, Redirect};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{info, instrument};

use crate::data::models::Profile;
use crate::data::profiles;
use crate::state::AppState;
use crate::utils::{allowed_image_extension, secure_filename};
use crate::web::auth::extractors::AuthUser;
use crate::web::error::{ApiError, PageError, db_error};
use crate::web::templates;

/// Largest accepted `/save_profile` body.
pub const MAX_PROFILE_UPLOAD: usize = 5 * 1024 * 1024;

const PHOTO_FIELD: &str = "profile_photo";

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    edit: Option<String>,
}

/// `GET /profile`
pub async fn profile(
    AuthUser(username): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ProfileQuery>,
) -> Result<Html<String>, PageError> {
    let existing = profiles::get_profile(&state.db_pool, &username)
        .await
        .map_err(|e| db_error("Loading profile", e))?;
    let editing = query.edit.as_deref() == Some("1");
    Ok(Html(templates::profile(&username, existing.as_ref(), editing)))
}

struct Upload {
    file_name: String,
    bytes: axum::body::Bytes,
}

fn non_empty(fields: &mut HashMap<String, String>, name: &str) -> Option<String> {
    fields
        .remove(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `POST /save_profile`
///
/// Text fields replace the stored profile. A photo is only replaced when a
/// new file is uploaded.
#[instrument(skip_all)]
pub async fn save_profile(
    AuthUser(username): AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Redirect, PageError> {
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut upload: Option<Upload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed form data: {e}")))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if name == PHOTO_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_owned();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Upload failed: {e}")))?;
            if !file_name.is_empty() && !bytes.is_empty() {
                upload = Some(Upload { file_name, bytes });
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("Malformed form data: {e}")))?;
            fields.insert(name, value);
        }
    }

    let age = match non_empty(&mut fields, "age") {
        Some(raw) => Some(
            raw.parse::<i64>()
                .ok()
                .filter(|a| *a >= 0)
                .ok_or_else(|| ApiError::invalid_input(format!("Invalid age '{raw}'")))?,
        ),
        None => None,
    };

    let existing = profiles::get_profile(&state.db_pool, &username)
        .await
        .map_err(|e| db_error("Loading profile", e))?;

    let photo = match upload {
        Some(upload) => Some(store_photo(&state, &username, upload).await?),
        None => existing.and_then(|p| p.photo),
    };

    let profile = Profile {
        username: username.clone(),
        full_name: non_empty(&mut fields, "full_name"),
        age,
        gender: non_empty(&mut fields, "gender"),
        email: non_empty(&mut fields, "email"),
        phone: non_empty(&mut fields, "phone"),
        address: non_empty(&mut fields, "address"),
        city: non_empty(&mut fields, "city"),
        state: non_empty(&mut fields, "state"),
        country: non_empty(&mut fields, "country"),
        photo,
    };
    profiles::upsert_profile(&state.db_pool, &profile)
        .await
        .map_err(|e| db_error("Saving profile", e))?;
    info!(username, "profile saved");

    Ok(Redirect::to("/profile"))
}

/// Length of the random segment that keeps stored photo names unique across users.
const PHOTO_ID_LEN: usize = 10;

/// Write an uploaded photo as `{username}_{id}_{filename}` (sanitized). Returns the stored name.
async fn store_photo(state: &AppState, username: &str, upload: Upload) -> Result<String, ApiError> {
    if allowed_image_extension(&upload.file_name).is_none() {
        return Err(ApiError::invalid_input(
            "Profile photo must be a .png, .jpg or .jpeg file.",
        ));
    }
    let id = nanoid::nanoid!(PHOTO_ID_LEN);
    let stored = secure_filename(&format!("{username}_{id}_{}", upload.file_name));
    if allowed_image_extension(&stored).is_none() {
        return Err(ApiError::invalid_input("Profile photo file name is not usable."));
    }

    let path = state.settings.upload_dir.join(&stored);
    tokio::fs::write(&path, &upload.bytes).await.map_err(|e| {
        tracing::error!(error = %e, path = %path.display(), "failed to write upload");
        ApiError::internal_error("Failed to store profile photo")
    })?;
    info!(username, file = %stored, size = upload.bytes.len(), "profile photo stored");
    Ok(stored)
}
