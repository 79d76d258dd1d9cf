//! Artwork model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{CommentWithAuthor, LikeWithUser, RecordId, UserSummary};

/// Kind of media an artwork points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    Video,
    Audio,
    Text,
}

impl MediaType {
    pub const ALL: [MediaType; 4] = [MediaType::Image, MediaType::Video, MediaType::Audio, MediaType::Text];

    /// Whether a declared upload content type fits this media type.
    ///
    /// Text artworks accept any document format.
    pub fn accepts(self, content_type: &str) -> bool {
        let content_type = content_type.trim().to_ascii_lowercase();
        match self {
            MediaType::Image => content_type.starts_with("image/"),
            MediaType::Video => content_type.starts_with("video/"),
            MediaType::Audio => content_type.starts_with("audio/"),
            MediaType::Text => true,
        }
    }

    /// Hint shown under the file picker
    pub fn accepted_formats(self) -> &'static str {
        match self {
            MediaType::Image => "JPG, PNG, GIF, WebP",
            MediaType::Video => "MP4, WebM, MOV",
            MediaType::Audio => "MP3, WAV, OGG",
            MediaType::Text => "TXT, PDF, DOC",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Image => write!(f, "image"),
            MediaType::Video => write!(f, "video"),
            MediaType::Audio => write!(f, "audio"),
            MediaType::Text => write!(f, "text"),
        }
    }
}

impl FromStr for MediaType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            "audio" => Ok(MediaType::Audio),
            "text" => Ok(MediaType::Text),
            _ => Err(anyhow::anyhow!("Invalid media type: {}", s)),
        }
    }
}

/// Row of the `artworks` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artwork {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub media_type: MediaType,
    pub media_url: String,
    pub artist_id: RecordId,
    pub created_at: DateTime<Utc>,
}

/// Artwork with its artist and engagement counts, as listed in the gallery
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtworkCard {
    #[serde(flatten)]
    pub artwork: Artwork,
    pub artist: Option<UserSummary>,
    pub like_count: u64,
    pub comment_count: u64,
}

impl ArtworkCard {
    /// Case-insensitive match over title, description and artist name
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        let contains = |s: &str| s.to_lowercase().contains(&term);
        contains(&self.artwork.title)
            || self.artwork.description.as_deref().is_some_and(contains)
            || self
                .artist
                .as_ref()
                .and_then(|a| a.name.as_deref())
                .is_some_and(contains)
    }
}

/// Artwork with its artist, as shown on the detail page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtworkDetail {
    #[serde(flatten)]
    pub artwork: Artwork,
    pub artist: Option<UserSummary>,
}

/// An artist's own artwork with every like and comment, for the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtworkEngagement {
    #[serde(flatten)]
    pub artwork: Artwork,
    pub likes: Vec<LikeWithUser>,
    pub comments: Vec<CommentWithAuthor>,
}

/// Insert payload for a new artwork
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewArtwork {
    pub title: String,
    pub description: String,
    pub artist_id: RecordId,
    pub category: String,
    pub media_type: MediaType,
    pub media_url: String,
}
