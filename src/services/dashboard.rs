//! Artist dashboard

use serde::Serialize;

use crate::backend::{BackendError, DynStore};
use crate::models::{ArtworkEngagement, AuthSession, NotificationWithContext};

/// Totals shown in the dashboard header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardTotals {
    pub artworks: usize,
    pub likes: usize,
    pub comments: usize,
}

impl DashboardTotals {
    pub fn of(artworks: &[ArtworkEngagement]) -> Self {
        Self {
            artworks: artworks.len(),
            likes: artworks.iter().map(|a| a.likes.len()).sum(),
            comments: artworks.iter().map(|a| a.comments.len()).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub artworks: Vec<ArtworkEngagement>,
    pub totals: DashboardTotals,
    pub notifications: Vec<NotificationWithContext>,
}

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("Only artists have a dashboard")]
    NotArtist,

    #[error("{0}")]
    Backend(#[from] BackendError),
}

/// Dashboard service
pub struct DashboardService {
    store: DynStore,
    notification_limit: usize,
}

impl DashboardService {
    pub fn new(store: DynStore, notification_limit: usize) -> Self {
        Self {
            store,
            notification_limit,
        }
    }

    pub async fn load(&self, session: &AuthSession) -> Result<DashboardView, DashboardError> {
        if !session.account.is_artist() {
            return Err(DashboardError::NotArtist);
        }
        let artist_id = &session.account.id;

        let artworks = self.store.artist_artworks(session, artist_id).await?;
        let notifications = self
            .store
            .recent_notifications(session, artist_id, self.notification_limit)
            .await?;

        Ok(DashboardView {
            totals: DashboardTotals::of(&artworks),
            artworks,
            notifications,
        })
    }
}
