//! Media uploads
//!
//! Artwork files and avatars go straight to a media CDN; the backend only
//! stores the returned URL.

mod cloudinary;
mod memory;

pub use cloudinary::CloudinaryUploader;
pub use memory::{MemoryUploader, StoredMedia};

use async_trait::async_trait;
use std::sync::Arc;

/// Error types for media uploads
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// Cloud name or upload preset missing
    #[error("Media storage is not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Transport(String),

    /// The CDN refused the file; carries its message
    #[error("{0}")]
    Rejected(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for MediaError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            MediaError::Decode(e.to_string())
        } else {
            MediaError::Transport(e.to_string())
        }
    }
}

/// A file ready to upload
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Uploads a file and returns its public HTTPS URL
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, file: MediaUpload) -> Result<String, MediaError>;
}

/// Shared uploader handle
pub type DynUploader = Arc<dyn MediaUploader>;
