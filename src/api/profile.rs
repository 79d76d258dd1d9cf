//! Profile owner actions: avatar and password changes

use axum::{
    extract::{Multipart, Path, State},
    response::Response,
    Form,
};
use serde::Deserialize;

use crate::api::middleware::{redirect_with_flash, AppState, Page};
use crate::api::pages::signed_in;
use crate::api::upload::read_multipart;
use crate::models::RecordId;
use crate::services::ProfileError;
use crate::theme::Flash;

fn profile_path(id: &RecordId) -> String {
    format!("/profile/{}", id)
}

/// POST /profile/{id}/avatar
pub async fn change_avatar(
    State(state): State<AppState>,
    Path(id): Path<String>,
    page: Page,
    multipart: Multipart,
) -> Response {
    let id = RecordId::from(id);
    let session = match signed_in(&page) {
        Ok(session) => session,
        Err(redirect) => return redirect,
    };

    let file = match read_multipart(multipart).await {
        Ok(form) => form.file,
        Err(e) => {
            tracing::warn!("Unreadable avatar form: {}", e);
            return redirect_with_flash(&profile_path(&id), Flash::error("Could not read the uploaded file."));
        }
    };
    let Some(file) = file else {
        return redirect_with_flash(&profile_path(&id), Flash::error(ProfileError::NotAnImage.to_string()));
    };

    match state.profiles.change_avatar(session, &id, file).await {
        Ok(updated) => state.redirect_signed_in(
            &profile_path(&id),
            &updated,
            Some(Flash::success("Profile picture updated.")),
        ),
        Err(e) => {
            tracing::warn!("Avatar change failed for {}: {}", id, e);
            redirect_with_flash(&profile_path(&id), Flash::error(e.to_string()))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm: String,
}

/// POST /profile/{id}/password
pub async fn change_password(
    State(state): State<AppState>,
    Path(id): Path<String>,
    page: Page,
    Form(form): Form<PasswordForm>,
) -> Response {
    let id = RecordId::from(id);
    let session = match signed_in(&page) {
        Ok(session) => session,
        Err(redirect) => return redirect,
    };

    match state
        .profiles
        .change_password(session, &id, &form.password, &form.confirm)
        .await
    {
        Ok(updated) => state.redirect_signed_in(
            &profile_path(&id),
            &updated,
            Some(Flash::success("Password changed.")),
        ),
        Err(e) => {
            tracing::warn!("Password change failed for {}: {}", id, e);
            redirect_with_flash(&profile_path(&id), Flash::error(e.to_string()))
        }
    }
}
