//! Like and comment models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RecordId, UserSummary};

/// Row of the `likes` table; unique per (user, artwork) on the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub id: RecordId,
    pub artwork_id: RecordId,
    pub user_id: RecordId,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A like together with the liking user, for the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LikeWithUser {
    pub id: RecordId,
    pub user: Option<UserSummary>,
}

/// Row of the `comments` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: RecordId,
    pub artwork_id: RecordId,
    pub user_id: RecordId,
    #[serde(rename = "comment_text")]
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Comment with its author, newest first on the detail page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: Option<UserSummary>,
}

/// Insert payload for a new comment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewComment {
    pub artwork_id: RecordId,
    pub user_id: RecordId,
    #[serde(rename = "comment_text")]
    pub text: String,
}
