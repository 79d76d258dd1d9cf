//! Artwork upload
//!
//! The form is checked in full before anything leaves the process: a
//! missing file, title or category, an oversized file or a content type
//! that contradicts the chosen media type never reach the CDN.

use crate::backend::{BackendError, DynStore};
use crate::media::{DynUploader, MediaError, MediaUpload};
use crate::models::{Artwork, AuthSession, MediaType, NewArtwork};

/// Submitted upload form
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub title: String,
    pub description: String,
    pub category: String,
    pub media_type: MediaType,
    pub file: Option<MediaUpload>,
}

/// Error types for uploads
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Please choose a file to upload")]
    MissingFile,

    #[error("Title is required")]
    MissingTitle,

    #[error("Category is required")]
    MissingCategory,

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("File is too large (maximum {max_mb} MB)")]
    FileTooLarge { max_mb: u64 },

    #[error("A {content_type} file cannot be uploaded as {media_type}")]
    ContentTypeMismatch {
        media_type: MediaType,
        content_type: String,
    },

    #[error("Only artists can upload artworks")]
    NotArtist,

    #[error("Upload failed: {0}")]
    Media(#[from] MediaError),

    #[error("Upload failed: {0}")]
    Backend(#[from] BackendError),
}

impl UploadError {
    /// Rejected before any network call
    pub fn is_validation(&self) -> bool {
        !matches!(self, UploadError::Media(_) | UploadError::Backend(_))
    }
}

/// Upload service
pub struct UploadService {
    store: DynStore,
    uploader: DynUploader,
    categories: Vec<String>,
    max_file_size: u64,
}

impl UploadService {
    pub fn new(store: DynStore, uploader: DynUploader, categories: Vec<String>, max_file_size: u64) -> Self {
        Self {
            store,
            uploader,
            categories,
            max_file_size,
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Check the form without touching the network
    pub fn validate(&self, form: &UploadForm) -> Result<(), UploadError> {
        let file = form.file.as_ref().ok_or(UploadError::MissingFile)?;
        if form.title.trim().is_empty() {
            return Err(UploadError::MissingTitle);
        }
        if form.category.trim().is_empty() {
            return Err(UploadError::MissingCategory);
        }
        if !self.categories.iter().any(|c| c == &form.category) {
            return Err(UploadError::UnknownCategory(form.category.clone()));
        }
        if file.bytes.len() as u64 > self.max_file_size {
            return Err(UploadError::FileTooLarge {
                max_mb: self.max_file_size / (1024 * 1024),
            });
        }
        if !form.media_type.accepts(&file.content_type) {
            return Err(UploadError::ContentTypeMismatch {
                media_type: form.media_type,
                content_type: file.content_type.clone(),
            });
        }
        Ok(())
    }

    /// Upload the file, then record the artwork under the caller's account
    pub async fn submit(&self, session: &AuthSession, form: UploadForm) -> Result<Artwork, UploadError> {
        if !session.account.is_artist() {
            return Err(UploadError::NotArtist);
        }
        self.validate(&form)?;

        let UploadForm {
            title,
            description,
            category,
            media_type,
            file,
        } = form;
        let file = file.ok_or(UploadError::MissingFile)?;

        let media_url = self.uploader.upload(file).await?;

        let artwork = self
            .store
            .insert_artwork(
                session,
                NewArtwork {
                    title: title.trim().to_string(),
                    description: description.trim().to_string(),
                    artist_id: session.account.id.clone(),
                    category,
                    media_type,
                    media_url,
                },
            )
            .await?;

        tracing::info!("Artwork {} uploaded by {}", artwork.id, session.account.id);
        Ok(artwork)
    }
}
