//! Artwork upload endpoint
//!
//! Accepts the multipart upload form. Validation failures re-render the
//! form with the submitted values; success lands on the new artwork.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use std::collections::HashMap;

use crate::api::common::upload_options;
use crate::api::middleware::{AppState, Page};
use crate::api::pages::signed_in;
use crate::media::MediaUpload;
use crate::services::{UploadError, UploadForm};

/// Text fields and the single `file` part of a multipart form
#[derive(Debug, Default)]
pub(crate) struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub file: Option<MediaUpload>,
}

/// Read every part; an empty file input counts as no file
pub(crate) async fn read_multipart(mut multipart: Multipart) -> Result<MultipartForm, MultipartError> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            let filename = field.file_name().map(str::to_string).unwrap_or_default();
            let content_type = field
                .content_type()
                .map(str::to_string)
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let bytes = field.bytes().await?;

            if !filename.is_empty() && !bytes.is_empty() {
                form.file = Some(MediaUpload {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
        } else {
            form.fields.insert(name, field.text().await?);
        }
    }

    Ok(form)
}

impl MultipartForm {
    fn field(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    fn into_upload_form(self) -> UploadForm {
        UploadForm {
            title: self.field("title"),
            description: self.field("description"),
            category: self.field("category"),
            media_type: self.field("media_type").parse().unwrap_or_default(),
            file: self.file,
        }
    }
}

fn render_form(
    state: &AppState,
    page: &Page,
    status: StatusCode,
    fields: &HashMap<String, String>,
    error: &str,
) -> Response {
    let mut context = upload_options(&state.uploads);
    context.insert("form", fields);
    context.insert("error", error);
    state.render_status(status, page, "upload.html", &context)
}

/// POST /upload - Upload the file and create the artwork
pub async fn submit(State(state): State<AppState>, page: Page, multipart: Multipart) -> Response {
    let session = match signed_in(&page) {
        Ok(session) => session,
        Err(redirect) => return redirect,
    };

    let form = match read_multipart(multipart).await {
        Ok(form) => form,
        Err(e) => {
            tracing::warn!("Unreadable upload form: {}", e);
            let message = if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                UploadError::FileTooLarge {
                    max_mb: state.uploads.max_file_size() / (1024 * 1024),
                }
                .to_string()
            } else {
                "Could not read the upload form.".to_string()
            };
            return render_form(&state, &page, e.status(), &HashMap::new(), &message);
        }
    };

    let fields = form.fields.clone();
    match state.uploads.submit(session, form.into_upload_form()).await {
        Ok(artwork) => Redirect::to(&format!("/gallery/{}", artwork.id)).into_response(),
        Err(UploadError::NotArtist) => Redirect::to("/").into_response(),
        Err(e) if e.is_validation() => {
            render_form(&state, &page, StatusCode::UNPROCESSABLE_ENTITY, &fields, &e.to_string())
        }
        Err(e) => {
            tracing::error!("Upload failed for {}: {}", session.account.id, e);
            render_form(&state, &page, StatusCode::BAD_GATEWAY, &fields, &e.to_string())
        }
    }
}
