//! In-memory backend
//!
//! Keeps accounts, sessions and table rows in process. It enforces the
//! rules the hosted backend enforces server-side (one like per user and
//! artwork, only artists insert artworks, writes need a live session) and
//! derives notifications from likes and comments the way the database
//! triggers do.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::{AccountAndDataStore, AccountUpdate, BackendError, SignUpOutcome, SignUpRequest};
use crate::models::{
    Account, Artwork, ArtworkCard, ArtworkDetail, ArtworkEngagement, AuthSession, Comment,
    CommentWithAuthor, Like, LikeWithUser, MediaType, NewArtwork, NewComment, Notification,
    NotificationKind, NotificationWithContext, Profile, RecordId, Role, UserSummary,
};

/// Default access token lifetime
fn default_token_ttl() -> Duration {
    Duration::hours(1)
}

#[derive(Debug, Clone)]
struct StoredAccount {
    account: Account,
    password: String,
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<RecordId, StoredAccount>,
    profiles: HashMap<RecordId, Profile>,
    /// access token -> (account id, expiry)
    access_tokens: HashMap<String, (RecordId, DateTime<Utc>)>,
    /// refresh token -> account id
    refresh_tokens: HashMap<String, RecordId>,
    /// recovery token hash -> account id
    recovery_tokens: HashMap<String, RecordId>,
    reset_requests: Vec<(String, String)>,
    artworks: Vec<Artwork>,
    likes: Vec<Like>,
    comments: Vec<Comment>,
    notifications: Vec<Notification>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl State {
    /// Strictly increasing timestamps so "newest first" is deterministic
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }

    fn summary(&self, id: &RecordId) -> Option<UserSummary> {
        self.profiles.get(id).map(|p| UserSummary {
            id: Some(p.id.clone()),
            name: p.name.clone(),
            avatar_url: p.avatar_url.clone(),
        })
    }

    fn issue_session(&mut self, account_id: &RecordId, ttl: Duration) -> Result<AuthSession, BackendError> {
        let stored = self
            .accounts
            .get(account_id)
            .ok_or_else(|| BackendError::Unauthorized("User not found".to_string()))?;
        let account = stored.account.clone();

        let access_token = uuid::Uuid::new_v4().to_string();
        let refresh_token = uuid::Uuid::new_v4().to_string();
        let expires_at = Utc::now() + ttl;

        self.access_tokens
            .insert(access_token.clone(), (account_id.clone(), expires_at));
        self.refresh_tokens.insert(refresh_token.clone(), account_id.clone());

        Ok(AuthSession {
            access_token,
            refresh_token,
            expires_at,
            account,
        })
    }

    /// Resolve a live access token to its account id
    fn authenticate(&self, session: &AuthSession) -> Result<RecordId, BackendError> {
        match self.access_tokens.get(&session.access_token) {
            Some((id, expires_at)) if *expires_at > Utc::now() => Ok(id.clone()),
            Some(_) => Err(BackendError::Unauthorized("JWT expired".to_string())),
            None => Err(BackendError::Unauthorized("Invalid JWT".to_string())),
        }
    }

    fn notify(&mut self, artwork_id: &RecordId, from_user_id: &RecordId, kind: NotificationKind) {
        let Some(artist_id) = self
            .artworks
            .iter()
            .find(|a| &a.id == artwork_id)
            .map(|a| a.artist_id.clone())
        else {
            return;
        };
        if &artist_id == from_user_id {
            return;
        }
        let created_at = self.tick();
        self.notifications.push(Notification {
            id: RecordId::random(),
            artist_id,
            from_user_id: from_user_id.clone(),
            artwork_id: artwork_id.clone(),
            kind,
            created_at,
        });
    }

    fn comment_with_author(&self, comment: &Comment) -> CommentWithAuthor {
        CommentWithAuthor {
            comment: comment.clone(),
            author: self.summary(&comment.user_id),
        }
    }
}

/// In-process [`AccountAndDataStore`]
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<State>,
    token_ttl: Duration,
    calls: AtomicUsize,
    fail_writes: AtomicBool,
    offline: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_token_ttl(default_token_ttl())
    }

    /// Store whose access tokens live for `ttl` (negative ttl issues expired tokens)
    pub fn with_token_ttl(ttl: Duration) -> Self {
        Self {
            state: RwLock::new(State::default()),
            token_ttl: ttl,
            calls: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            offline: AtomicBool::new(false),
        }
    }

    /// Number of backend calls served so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every table write fail, to exercise error paths
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make session refreshes and writes fail as if the network were down
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), BackendError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("network unreachable".to_string()));
        }
        Ok(())
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), BackendError> {
        self.check_online()?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("connection reset".to_string()));
        }
        Ok(())
    }

    /// Create an account (and its users row) without going through sign-up
    pub async fn seed_account(&self, name: &str, email: &str, password: &str, role: Role) -> Account {
        let mut state = self.state.write().await;
        let account = Account {
            id: RecordId::random(),
            email: email.to_string(),
            name: Some(name.to_string()),
            avatar_url: None,
            role,
        };
        let created_at = state.tick();
        state.profiles.insert(
            account.id.clone(),
            Profile {
                id: account.id.clone(),
                name: Some(name.to_string()),
                email: Some(email.to_string()),
                avatar_url: None,
                role,
                created_at: Some(created_at),
            },
        );
        state.accounts.insert(
            account.id.clone(),
            StoredAccount {
                account: account.clone(),
                password: password.to_string(),
            },
        );
        account
    }

    /// Insert an artwork row directly
    pub async fn seed_artwork(&self, artist_id: &RecordId, title: &str, description: &str, category: &str) -> Artwork {
        let mut state = self.state.write().await;
        let created_at = state.tick();
        let artwork = Artwork {
            id: RecordId::random(),
            title: title.to_string(),
            description: Some(description.to_string()),
            category: category.to_string(),
            media_type: MediaType::Image,
            media_url: format!("https://media.invalid/{}.png", title.to_lowercase().replace(' ', "-")),
            artist_id: artist_id.clone(),
            created_at,
        };
        state.artworks.push(artwork.clone());
        artwork
    }

    /// Recovery token issued by the last reset request for `email`
    pub async fn recovery_token_for(&self, email: &str) -> Option<String> {
        let state = self.state.read().await;
        let account_id = state
            .accounts
            .values()
            .find(|a| a.account.email.eq_ignore_ascii_case(email))
            .map(|a| a.account.id.clone())?;
        state
            .recovery_tokens
            .iter()
            .find(|(_, id)| **id == account_id)
            .map(|(token, _)| token.clone())
    }

    /// Redirect URLs passed with each reset request, oldest first
    pub async fn reset_requests(&self) -> Vec<(String, String)> {
        self.state.read().await.reset_requests.clone()
    }
}

#[async_trait]
impl AccountAndDataStore for MemoryStore {
    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome, BackendError> {
        self.record_call();
        {
            let state = self.state.read().await;
            if state
                .accounts
                .values()
                .any(|a| a.account.email.eq_ignore_ascii_case(&request.email))
            {
                return Err(BackendError::Api {
                    status: 422,
                    message: "User already registered".to_string(),
                });
            }
        }

        let account = self
            .seed_account(&request.name, &request.email, &request.password, request.role)
            .await;
        let session = self.state.write().await.issue_session(&account.id, self.token_ttl)?;
        Ok(SignUpOutcome {
            account,
            session: Some(session),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        self.record_call();
        let mut state = self.state.write().await;
        let id = state
            .accounts
            .values()
            .find(|a| a.account.email.eq_ignore_ascii_case(email) && a.password == password)
            .map(|a| a.account.id.clone())
            .ok_or_else(|| BackendError::Api {
                status: 400,
                message: "Invalid login credentials".to_string(),
            })?;
        state.issue_session(&id, self.token_ttl)
    }

    async fn sign_out(&self, session: &AuthSession) -> Result<(), BackendError> {
        self.record_call();
        let mut state = self.state.write().await;
        state.access_tokens.remove(&session.access_token);
        state.refresh_tokens.remove(&session.refresh_token);
        Ok(())
    }

    async fn request_password_reset(&self, email: &str, redirect_to: &str) -> Result<(), BackendError> {
        self.record_call();
        let mut state = self.state.write().await;
        state
            .reset_requests
            .push((email.to_string(), redirect_to.to_string()));

        // Unknown emails succeed silently, like the hosted service
        if let Some(id) = state
            .accounts
            .values()
            .find(|a| a.account.email.eq_ignore_ascii_case(email))
            .map(|a| a.account.id.clone())
        {
            state.recovery_tokens.retain(|_, owner| *owner != id);
            state
                .recovery_tokens
                .insert(uuid::Uuid::new_v4().simple().to_string(), id);
        }
        Ok(())
    }

    async fn verify_recovery(&self, token_hash: &str) -> Result<AuthSession, BackendError> {
        self.record_call();
        let mut state = self.state.write().await;
        let id = state
            .recovery_tokens
            .remove(token_hash)
            .ok_or_else(|| BackendError::Unauthorized("Email link is invalid or has expired".to_string()))?;
        state.issue_session(&id, self.token_ttl)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        self.record_call();
        self.check_online()?;
        let mut state = self.state.write().await;
        let id = state
            .refresh_tokens
            .remove(refresh_token)
            .ok_or_else(|| BackendError::Unauthorized("Invalid Refresh Token".to_string()))?;
        state.issue_session(&id, default_token_ttl())
    }

    async fn update_account(&self, session: &AuthSession, update: AccountUpdate) -> Result<Account, BackendError> {
        self.record_call();
        self.check_writable()?;
        let mut state = self.state.write().await;
        let id = state.authenticate(session)?;
        let stored = state
            .accounts
            .get_mut(&id)
            .ok_or_else(|| BackendError::Unauthorized("User not found".to_string()))?;
        if let Some(password) = update.password {
            stored.password = password;
        }
        if let Some(avatar_url) = update.avatar_url {
            stored.account.avatar_url = Some(avatar_url);
        }
        Ok(stored.account.clone())
    }

    async fn list_artworks(&self, limit: Option<usize>) -> Result<Vec<ArtworkCard>, BackendError> {
        self.record_call();
        let state = self.state.read().await;
        let mut cards: Vec<ArtworkCard> = state
            .artworks
            .iter()
            .map(|a| ArtworkCard {
                artwork: a.clone(),
                artist: state.summary(&a.artist_id),
                like_count: state.likes.iter().filter(|l| l.artwork_id == a.id).count() as u64,
                comment_count: state.comments.iter().filter(|c| c.artwork_id == a.id).count() as u64,
            })
            .collect();
        cards.sort_by(|a, b| b.artwork.created_at.cmp(&a.artwork.created_at));
        if let Some(limit) = limit {
            cards.truncate(limit);
        }
        Ok(cards)
    }

    async fn get_artwork(&self, id: &RecordId) -> Result<Option<ArtworkDetail>, BackendError> {
        self.record_call();
        let state = self.state.read().await;
        Ok(state.artworks.iter().find(|a| &a.id == id).map(|a| ArtworkDetail {
            artwork: a.clone(),
            artist: state.summary(&a.artist_id),
        }))
    }

    async fn insert_artwork(&self, session: &AuthSession, artwork: NewArtwork) -> Result<Artwork, BackendError> {
        self.record_call();
        self.check_writable()?;
        let mut state = self.state.write().await;
        let caller = state.authenticate(session)?;
        let is_artist = state.profiles.get(&caller).is_some_and(Profile::is_artist);
        if caller != artwork.artist_id || !is_artist {
            return Err(BackendError::Unauthorized(
                "new row violates row-level security policy for table \"artworks\"".to_string(),
            ));
        }

        let created_at = state.tick();
        let row = Artwork {
            id: RecordId::random(),
            title: artwork.title,
            description: Some(artwork.description).filter(|d| !d.is_empty()),
            category: artwork.category,
            media_type: artwork.media_type,
            media_url: artwork.media_url,
            artist_id: artwork.artist_id,
            created_at,
        };
        state.artworks.push(row.clone());
        Ok(row)
    }

    async fn artist_artworks(&self, session: &AuthSession, artist_id: &RecordId) -> Result<Vec<ArtworkEngagement>, BackendError> {
        self.record_call();
        let state = self.state.read().await;
        state.authenticate(session)?;
        let mut works: Vec<ArtworkEngagement> = state
            .artworks
            .iter()
            .filter(|a| &a.artist_id == artist_id)
            .map(|a| ArtworkEngagement {
                artwork: a.clone(),
                likes: state
                    .likes
                    .iter()
                    .filter(|l| l.artwork_id == a.id)
                    .map(|l| LikeWithUser {
                        id: l.id.clone(),
                        user: state.summary(&l.user_id),
                    })
                    .collect(),
                comments: state
                    .comments
                    .iter()
                    .filter(|c| c.artwork_id == a.id)
                    .map(|c| state.comment_with_author(c))
                    .collect(),
            })
            .collect();
        works.sort_by(|a, b| b.artwork.created_at.cmp(&a.artwork.created_at));
        Ok(works)
    }

    async fn profile_artworks(&self, artist_id: &RecordId) -> Result<Vec<Artwork>, BackendError> {
        self.record_call();
        let state = self.state.read().await;
        let mut works: Vec<Artwork> = state
            .artworks
            .iter()
            .filter(|a| &a.artist_id == artist_id)
            .cloned()
            .collect();
        works.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(works)
    }

    async fn count_likes(&self, artwork_id: &RecordId) -> Result<u64, BackendError> {
        self.record_call();
        let state = self.state.read().await;
        Ok(state.likes.iter().filter(|l| &l.artwork_id == artwork_id).count() as u64)
    }

    async fn has_liked(&self, artwork_id: &RecordId, user_id: &RecordId) -> Result<bool, BackendError> {
        self.record_call();
        let state = self.state.read().await;
        Ok(state
            .likes
            .iter()
            .any(|l| &l.artwork_id == artwork_id && &l.user_id == user_id))
    }

    async fn insert_like(&self, session: &AuthSession, artwork_id: &RecordId) -> Result<(), BackendError> {
        self.record_call();
        self.check_writable()?;
        let mut state = self.state.write().await;
        let user_id = state.authenticate(session)?;
        if state
            .likes
            .iter()
            .any(|l| &l.artwork_id == artwork_id && l.user_id == user_id)
        {
            return Err(BackendError::Conflict(
                "duplicate key value violates unique constraint \"likes_user_artwork_key\"".to_string(),
            ));
        }
        let created_at = state.tick();
        state.likes.push(Like {
            id: RecordId::random(),
            artwork_id: artwork_id.clone(),
            user_id: user_id.clone(),
            created_at: Some(created_at),
        });
        state.notify(artwork_id, &user_id, NotificationKind::Like);
        Ok(())
    }

    async fn delete_like(&self, session: &AuthSession, artwork_id: &RecordId) -> Result<(), BackendError> {
        self.record_call();
        self.check_writable()?;
        let mut state = self.state.write().await;
        let user_id = state.authenticate(session)?;
        state
            .likes
            .retain(|l| !(&l.artwork_id == artwork_id && l.user_id == user_id));
        Ok(())
    }

    async fn list_comments(&self, artwork_id: &RecordId) -> Result<Vec<CommentWithAuthor>, BackendError> {
        self.record_call();
        let state = self.state.read().await;
        let mut comments: Vec<CommentWithAuthor> = state
            .comments
            .iter()
            .filter(|c| &c.artwork_id == artwork_id)
            .map(|c| state.comment_with_author(c))
            .collect();
        comments.sort_by(|a, b| b.comment.created_at.cmp(&a.comment.created_at));
        Ok(comments)
    }

    async fn insert_comment(&self, session: &AuthSession, comment: NewComment) -> Result<CommentWithAuthor, BackendError> {
        self.record_call();
        self.check_writable()?;
        let mut state = self.state.write().await;
        let user_id = state.authenticate(session)?;
        if user_id != comment.user_id {
            return Err(BackendError::Unauthorized(
                "new row violates row-level security policy for table \"comments\"".to_string(),
            ));
        }
        let created_at = state.tick();
        let row = Comment {
            id: RecordId::random(),
            artwork_id: comment.artwork_id,
            user_id: comment.user_id,
            text: comment.text,
            created_at,
        };
        state.comments.push(row.clone());
        state.notify(&row.artwork_id, &user_id, NotificationKind::Comment);
        Ok(state.comment_with_author(&row))
    }

    async fn recent_notifications(
        &self,
        session: &AuthSession,
        artist_id: &RecordId,
        limit: usize,
    ) -> Result<Vec<NotificationWithContext>, BackendError> {
        self.record_call();
        let state = self.state.read().await;
        state.authenticate(session)?;
        let mut notifications: Vec<NotificationWithContext> = state
            .notifications
            .iter()
            .filter(|n| &n.artist_id == artist_id)
            .map(|n| NotificationWithContext {
                notification: n.clone(),
                from_user: state.summary(&n.from_user_id),
                artwork_title: state
                    .artworks
                    .iter()
                    .find(|a| a.id == n.artwork_id)
                    .map(|a| a.title.clone()),
            })
            .collect();
        notifications.sort_by(|a, b| b.notification.created_at.cmp(&a.notification.created_at));
        notifications.truncate(limit);
        Ok(notifications)
    }

    async fn get_profile(&self, id: &RecordId) -> Result<Option<Profile>, BackendError> {
        self.record_call();
        Ok(self.state.read().await.profiles.get(id).cloned())
    }

    async fn update_profile_avatar(&self, session: &AuthSession, avatar_url: &str) -> Result<(), BackendError> {
        self.record_call();
        self.check_writable()?;
        let mut state = self.state.write().await;
        let id = state.authenticate(session)?;
        let profile = state
            .profiles
            .get_mut(&id)
            .ok_or_else(|| BackendError::Api {
                status: 404,
                message: "profile not found".to_string(),
            })?;
        profile.avatar_url = Some(avatar_url.to_string());
        Ok(())
    }
}
