//! Notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{RecordId, UserSummary};

/// What triggered a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Comment,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Like => write!(f, "like"),
            Self::Comment => write!(f, "comment"),
        }
    }
}

/// Row of the `notifications` table, derived from likes and comments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: RecordId,
    /// Recipient artist
    pub artist_id: RecordId,
    pub from_user_id: RecordId,
    pub artwork_id: RecordId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

/// Notification with the source user and artwork title joined in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationWithContext {
    #[serde(flatten)]
    pub notification: Notification,
    pub from_user: Option<UserSummary>,
    pub artwork_title: Option<String>,
}

impl NotificationWithContext {
    /// Verb used in the dashboard feed ("Rani liked your artwork")
    pub fn verb(&self) -> &'static str {
        match self.notification.kind {
            NotificationKind::Like => "liked",
            NotificationKind::Comment => "commented on",
        }
    }
}
