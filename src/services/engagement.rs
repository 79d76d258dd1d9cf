//! Likes and comments

use serde::{Deserialize, Serialize};

use crate::backend::{BackendError, DynStore};
use crate::models::{AuthSession, CommentWithAuthor, NewComment, RecordId};

/// Like state as shown to the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LikeState {
    pub liked: bool,
    pub count: u64,
}

/// Error types for engagement operations
#[derive(Debug, thiserror::Error)]
pub enum EngagementError {
    /// Anonymous viewer; carries the path to come back to after login
    #[error("Please log in to continue")]
    LoginRequired { return_to: String },

    #[error("Comment cannot be empty")]
    EmptyComment,

    #[error("{0}")]
    Backend(#[from] BackendError),
}

/// Engagement service
pub struct EngagementService {
    store: DynStore,
}

impl EngagementService {
    pub fn new(store: DynStore) -> Self {
        Self { store }
    }

    /// Current like state of an artwork for a viewer.
    ///
    /// The total and the viewer's own like are separate queries.
    pub async fn like_state(
        &self,
        artwork_id: &RecordId,
        viewer: Option<&RecordId>,
    ) -> Result<LikeState, BackendError> {
        let count = self.store.count_likes(artwork_id).await?;
        let liked = match viewer {
            Some(user_id) => self.store.has_liked(artwork_id, user_id).await?,
            None => false,
        };
        Ok(LikeState { liked, count })
    }

    /// Like or unlike, deciding from the backend's current state.
    ///
    /// A duplicate insert means the like already exists. The returned state
    /// is read back after the write.
    pub async fn toggle_like(
        &self,
        session: Option<&AuthSession>,
        artwork_id: &RecordId,
    ) -> Result<LikeState, EngagementError> {
        let session = session.ok_or_else(|| EngagementError::LoginRequired {
            return_to: format!("/gallery/{artwork_id}"),
        })?;
        let user_id = &session.account.id;

        if self.store.has_liked(artwork_id, user_id).await? {
            self.store.delete_like(session, artwork_id).await?;
        } else {
            match self.store.insert_like(session, artwork_id).await {
                Ok(()) => {}
                Err(BackendError::Conflict(e)) => {
                    tracing::debug!("Like on {} already recorded: {}", artwork_id, e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(self.like_state(artwork_id, Some(user_id)).await?)
    }

    /// Comments on an artwork, newest first
    pub async fn comments(&self, artwork_id: &RecordId) -> Result<Vec<CommentWithAuthor>, BackendError> {
        self.store.list_comments(artwork_id).await
    }

    /// Post a comment; blank text never reaches the backend
    pub async fn post_comment(
        &self,
        session: Option<&AuthSession>,
        artwork_id: &RecordId,
        text: &str,
    ) -> Result<CommentWithAuthor, EngagementError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EngagementError::EmptyComment);
        }
        let session = session.ok_or_else(|| EngagementError::LoginRequired {
            return_to: format!("/gallery/{artwork_id}"),
        })?;

        let comment = self
            .store
            .insert_comment(
                session,
                NewComment {
                    artwork_id: artwork_id.clone(),
                    user_id: session.account.id.clone(),
                    text: text.to_string(),
                },
            )
            .await?;
        Ok(comment)
    }
}
