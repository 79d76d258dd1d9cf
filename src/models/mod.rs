//! Data models
//!
//! This module contains the data structures the gallery front-end consumes.
//! The rows themselves are owned by the hosted backend; these types are the
//! decoded, backend-neutral view of them:
//! - Accounts, profiles and the artist role
//! - Artworks and their engagement (likes, comments)
//! - Notifications derived from engagement
//! - Auth sessions persisted in the browser

mod account;
mod artwork;
mod comment;
mod id;
mod notification;
mod session;

pub use account::{validated_avatar_url, Account, Profile, Role, UserSummary};
pub use artwork::{Artwork, ArtworkCard, ArtworkDetail, ArtworkEngagement, MediaType, NewArtwork};
pub use comment::{Comment, CommentWithAuthor, Like, LikeWithUser, NewComment};
pub use id::RecordId;
pub use notification::{Notification, NotificationKind, NotificationWithContext};
pub use session::AuthSession;
