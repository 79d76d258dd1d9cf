//! Profile pages
//!
//! Anyone signed in can view a profile. Only the owner may change the
//! avatar or password.

use serde::Serialize;
use std::sync::Arc;

use crate::backend::{BackendError, DynStore};
use crate::media::{DynUploader, MediaError, MediaUpload};
use crate::models::{Artwork, AuthSession, MediaType, Profile, RecordId};
use crate::services::session::{SessionError, SessionService};
use crate::services::validation::MIN_PROFILE_PASSWORD_LEN;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView {
    pub profile: Profile,
    /// Newest first; empty for non-artists
    pub artworks: Vec<Artwork>,
    pub is_owner: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("You can only change your own profile")]
    NotOwner,

    #[error("Please choose an image file")]
    NotAnImage,

    #[error("File is too large (maximum {max_mb} MB)")]
    FileTooLarge { max_mb: u64 },

    #[error("Avatar upload failed: {0}")]
    Media(#[from] MediaError),

    #[error("{0}")]
    Session(#[from] SessionError),

    #[error("{0}")]
    Backend(#[from] BackendError),
}

/// Profile service
pub struct ProfileService {
    store: DynStore,
    uploader: DynUploader,
    sessions: Arc<SessionService>,
    max_file_size: u64,
}

impl ProfileService {
    pub fn new(store: DynStore, uploader: DynUploader, sessions: Arc<SessionService>, max_file_size: u64) -> Self {
        Self {
            store,
            uploader,
            sessions,
            max_file_size,
        }
    }

    pub async fn view(&self, id: &RecordId, viewer: Option<&RecordId>) -> Result<Option<ProfileView>, BackendError> {
        let Some(profile) = self.store.get_profile(id).await? else {
            return Ok(None);
        };

        let artworks = if profile.is_artist() {
            self.store.profile_artworks(&profile.id).await?
        } else {
            Vec::new()
        };

        Ok(Some(ProfileView {
            is_owner: viewer == Some(&profile.id),
            profile,
            artworks,
        }))
    }

    fn ensure_owner(session: &AuthSession, profile_id: &RecordId) -> Result<(), ProfileError> {
        if &session.account.id != profile_id {
            return Err(ProfileError::NotOwner);
        }
        Ok(())
    }

    /// Upload a new avatar, store it on the users row and in the account metadata.
    ///
    /// Returns the session carrying the updated account.
    pub async fn change_avatar(
        &self,
        session: &AuthSession,
        profile_id: &RecordId,
        file: MediaUpload,
    ) -> Result<AuthSession, ProfileError> {
        Self::ensure_owner(session, profile_id)?;
        if !MediaType::Image.accepts(&file.content_type) {
            return Err(ProfileError::NotAnImage);
        }
        if file.bytes.len() as u64 > self.max_file_size {
            return Err(ProfileError::FileTooLarge {
                max_mb: self.max_file_size / (1024 * 1024),
            });
        }

        let url = self.uploader.upload(file).await?;
        self.store.update_profile_avatar(session, &url).await?;
        let updated = self.sessions.update_avatar(session, &url).await?;

        tracing::info!("Avatar updated for {}", profile_id);
        Ok(updated)
    }

    pub async fn change_password(
        &self,
        session: &AuthSession,
        profile_id: &RecordId,
        password: &str,
        confirm: &str,
    ) -> Result<AuthSession, ProfileError> {
        Self::ensure_owner(session, profile_id)?;
        Ok(self
            .sessions
            .update_password(session, password, confirm, Some(MIN_PROFILE_PASSWORD_LEN))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AccountAndDataStore, MemoryStore};
    use crate::media::MemoryUploader;
    use crate::models::Role;
    use crate::services::validation::ValidationError;

    struct Fixture {
        store: Arc<MemoryStore>,
        uploader: Arc<MemoryUploader>,
        profiles: ProfileService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let uploader = Arc::new(MemoryUploader::default());
        let sessions = Arc::new(SessionService::new(store.clone(), "http://localhost/update-password"));
        let profiles = ProfileService::new(store.clone(), uploader.clone(), sessions, 1024);
        Fixture {
            store,
            uploader,
            profiles,
        }
    }

    fn avatar(content_type: &str) -> MediaUpload {
        MediaUpload {
            filename: "me.jpg".into(),
            content_type: content_type.into(),
            bytes: vec![7; 16],
        }
    }

    #[tokio::test]
    async fn test_artist_profile_lists_artworks() {
        let fx = fixture();
        let artist = fx.store.seed_account("Rani", "rani@x.id", "Rahasia#1", Role::Artist).await;
        let fan = fx.store.seed_account("Budi", "budi@x.id", "Rahasia#2", Role::User).await;
        fx.store.seed_artwork(&artist.id, "Satu", "", "alam").await;
        fx.store.seed_artwork(&artist.id, "Dua", "", "alam").await;

        let view = fx.profiles.view(&artist.id, Some(&fan.id)).await.unwrap().unwrap();
        assert_eq!(view.artworks.len(), 2);
        assert_eq!(view.artworks[0].title, "Dua");
        assert!(!view.is_owner);

        let own = fx.profiles.view(&fan.id, Some(&fan.id)).await.unwrap().unwrap();
        assert!(own.artworks.is_empty());
        assert!(own.is_owner);

        assert!(fx.profiles.view(&RecordId::from("nobody"), None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_change_avatar_updates_row_and_metadata() {
        let fx = fixture();
        let account = fx.store.seed_account("Budi", "budi@x.id", "Rahasia#2", Role::User).await;
        let session = fx.store.sign_in("budi@x.id", "Rahasia#2").await.unwrap();

        let updated = fx
            .profiles
            .change_avatar(&session, &account.id, avatar("image/jpeg"))
            .await
            .unwrap();

        let url = updated.account.avatar_url.clone().unwrap();
        assert!(url.starts_with("https://media.invalid/"));
        let profile = fx.store.get_profile(&account.id).await.unwrap().unwrap();
        assert_eq!(profile.avatar_url.as_deref(), Some(url.as_str()));
    }

    #[tokio::test]
    async fn test_only_owner_changes_avatar() {
        let fx = fixture();
        let other = fx.store.seed_account("Rani", "rani@x.id", "Rahasia#1", Role::Artist).await;
        fx.store.seed_account("Budi", "budi@x.id", "Rahasia#2", Role::User).await;
        let session = fx.store.sign_in("budi@x.id", "Rahasia#2").await.unwrap();

        let err = fx
            .profiles
            .change_avatar(&session, &other.id, avatar("image/png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileError::NotOwner));
        assert!(fx.uploader.uploads().await.is_empty());
    }

    #[tokio::test]
    async fn test_avatar_must_be_image() {
        let fx = fixture();
        let account = fx.store.seed_account("Budi", "budi@x.id", "Rahasia#2", Role::User).await;
        let session = fx.store.sign_in("budi@x.id", "Rahasia#2").await.unwrap();

        let err = fx
            .profiles
            .change_avatar(&session, &account.id, avatar("video/mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileError::NotAnImage));
    }

    #[tokio::test]
    async fn test_profile_password_needs_six_chars() {
        let fx = fixture();
        let account = fx.store.seed_account("Budi", "budi@x.id", "Rahasia#2", Role::User).await;
        let session = fx.store.sign_in("budi@x.id", "Rahasia#2").await.unwrap();

        let err = fx
            .profiles
            .change_password(&session, &account.id, "abc", "abc")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProfileError::Session(SessionError::Validation(ValidationError::PasswordTooShort(6)))
        ));

        fx.profiles
            .change_password(&session, &account.id, "abcdef", "abcdef")
            .await
            .unwrap();
        assert!(fx.store.sign_in("budi@x.id", "abcdef").await.is_ok());
    }
}
