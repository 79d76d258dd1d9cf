//! Hosted backend access
//!
//! Authentication and row-level table access are delegated to a
//! backend-as-a-service. Everything the front-end needs from it goes
//! through [`AccountAndDataStore`]:
//! - [`SupabaseStore`]: GoTrue auth + PostgREST data over HTTP
//! - [`MemoryStore`]: in-process store for tests and the `demo` feature

mod memory;
mod supabase;

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{
    Account, Artwork, ArtworkCard, ArtworkDetail, ArtworkEngagement, AuthSession,
    CommentWithAuthor, NewArtwork, NewComment, NotificationWithContext, Profile, RecordId, Role,
};

/// Error types for backend calls
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The request never produced a response
    #[error("Network error: {0}")]
    Transport(String),

    /// The service answered with an error status
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Unique constraint hit (duplicate like, existing email)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing or rejected credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The response body did not have the expected shape
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// No backend URL or key configured
    #[error("Backend is not configured")]
    NotConfigured,
}

impl BackendError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Api { status, .. } => Some(*status),
            BackendError::Conflict(_) => Some(409),
            BackendError::Unauthorized(_) => Some(401),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::Decode(e.to_string())
        } else {
            BackendError::Transport(e.to_string())
        }
    }
}

/// Sign-up payload; name and role land in the account metadata
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Result of a sign-up.
///
/// The session is absent when the service requires email confirmation.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub account: Account,
    pub session: Option<AuthSession>,
}

/// Changes applied to the signed-in account
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub password: Option<String>,
    pub avatar_url: Option<String>,
}

/// Authentication calls plus row-level table access
#[async_trait]
pub trait AccountAndDataStore: Send + Sync {
    // ---- auth ----

    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome, BackendError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError>;

    /// Revoke the session server-side
    async fn sign_out(&self, session: &AuthSession) -> Result<(), BackendError>;

    /// Send the password-reset email pointing at `redirect_to`
    async fn request_password_reset(&self, email: &str, redirect_to: &str) -> Result<(), BackendError>;

    /// Exchange a recovery link token for a session
    async fn verify_recovery(&self, token_hash: &str) -> Result<AuthSession, BackendError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError>;

    /// Update password and/or account metadata
    async fn update_account(&self, session: &AuthSession, update: AccountUpdate) -> Result<Account, BackendError>;

    // ---- artworks ----

    /// Artwork cards newest first, optionally limited
    async fn list_artworks(&self, limit: Option<usize>) -> Result<Vec<ArtworkCard>, BackendError>;

    async fn get_artwork(&self, id: &RecordId) -> Result<Option<ArtworkDetail>, BackendError>;

    async fn insert_artwork(&self, session: &AuthSession, artwork: NewArtwork) -> Result<Artwork, BackendError>;

    /// Artist's works newest first with every like and comment
    async fn artist_artworks(&self, session: &AuthSession, artist_id: &RecordId) -> Result<Vec<ArtworkEngagement>, BackendError>;

    /// Plain artwork rows by artist, newest first
    async fn profile_artworks(&self, artist_id: &RecordId) -> Result<Vec<Artwork>, BackendError>;

    // ---- engagement ----

    async fn count_likes(&self, artwork_id: &RecordId) -> Result<u64, BackendError>;

    async fn has_liked(&self, artwork_id: &RecordId, user_id: &RecordId) -> Result<bool, BackendError>;

    async fn insert_like(&self, session: &AuthSession, artwork_id: &RecordId) -> Result<(), BackendError>;

    async fn delete_like(&self, session: &AuthSession, artwork_id: &RecordId) -> Result<(), BackendError>;

    /// Comments newest first with their authors
    async fn list_comments(&self, artwork_id: &RecordId) -> Result<Vec<CommentWithAuthor>, BackendError>;

    async fn insert_comment(&self, session: &AuthSession, comment: NewComment) -> Result<CommentWithAuthor, BackendError>;

    async fn recent_notifications(
        &self,
        session: &AuthSession,
        artist_id: &RecordId,
        limit: usize,
    ) -> Result<Vec<NotificationWithContext>, BackendError>;

    // ---- profiles ----

    async fn get_profile(&self, id: &RecordId) -> Result<Option<Profile>, BackendError>;

    /// Set `avatar_url` on the caller's users row
    async fn update_profile_avatar(&self, session: &AuthSession, avatar_url: &str) -> Result<(), BackendError>;
}

/// Shared store handle
pub type DynStore = Arc<dyn AccountAndDataStore>;
