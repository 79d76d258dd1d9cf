//! Supabase-compatible backend adapter
//!
//! Auth goes to the GoTrue endpoints under `/auth/v1`, table access to
//! PostgREST under `/rest/v1`. Every request carries the anon key as
//! `apikey`; authenticated calls send the user's access token as the bearer
//! so row-level security sees the caller.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;

use super::{AccountAndDataStore, AccountUpdate, BackendError, SignUpOutcome, SignUpRequest};
use crate::config::BackendConfig;
use crate::models::{
    Account, Artwork, ArtworkCard, ArtworkDetail, ArtworkEngagement, AuthSession, Comment,
    CommentWithAuthor, LikeWithUser, NewArtwork, NewComment, Notification,
    NotificationWithContext, Profile, RecordId, Role, UserSummary,
};

const USER_SUMMARY: &str = "id,name,avatar_url";

/// Account and data store backed by a Supabase project
pub struct SupabaseStore {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseStore {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        if !config.is_configured() {
            return Err(BackendError::NotConfigured);
        }
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
        })
    }

    fn auth(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        self.request(method, format!("{}/auth/v1/{}", self.base_url, path), token)
    }

    fn rest(&self, method: Method, table: &str, token: Option<&str>) -> RequestBuilder {
        self.request(method, format!("{}/rest/v1/{}", self.base_url, table), token)
    }

    fn request(&self, method: Method, url: String, token: Option<&str>) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token.unwrap_or(self.anon_key.as_str()))
    }

    async fn session_from(&self, response: Response) -> Result<AuthSession, BackendError> {
        let body: SessionResponse = check(response).await?.json().await?;
        Ok(body.into_session())
    }
}

#[async_trait]
impl AccountAndDataStore for SupabaseStore {
    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome, BackendError> {
        let response = self
            .auth(Method::POST, "signup", None)
            .json(&json!({
                "email": request.email,
                "password": request.password,
                "data": {
                    "name": request.name,
                    "role": request.role.metadata_code(),
                },
            }))
            .send()
            .await?;

        let body: SignUpResponse = check(response).await?.json().await?;
        Ok(match body {
            SignUpResponse::Session(session) => {
                let session = session.into_session();
                SignUpOutcome {
                    account: session.account.clone(),
                    session: Some(session),
                }
            }
            SignUpResponse::User(user) => SignUpOutcome {
                account: user.into_account(),
                session: None,
            },
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let response = self
            .auth(Method::POST, "token", None)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        self.session_from(response).await
    }

    async fn sign_out(&self, session: &AuthSession) -> Result<(), BackendError> {
        let response = self
            .auth(Method::POST, "logout", Some(&session.access_token))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn request_password_reset(&self, email: &str, redirect_to: &str) -> Result<(), BackendError> {
        let response = self
            .auth(Method::POST, "recover", None)
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn verify_recovery(&self, token_hash: &str) -> Result<AuthSession, BackendError> {
        let response = self
            .auth(Method::POST, "verify", None)
            .json(&json!({ "type": "recovery", "token_hash": token_hash }))
            .send()
            .await?;
        self.session_from(response).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        let response = self
            .auth(Method::POST, "token", None)
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        self.session_from(response).await
    }

    async fn update_account(&self, session: &AuthSession, update: AccountUpdate) -> Result<Account, BackendError> {
        let mut body = serde_json::Map::new();
        if let Some(password) = update.password {
            body.insert("password".into(), json!(password));
        }
        if let Some(avatar_url) = update.avatar_url {
            body.insert("data".into(), json!({ "avatar_url": avatar_url }));
        }

        let response = self
            .auth(Method::PUT, "user", Some(&session.access_token))
            .json(&body)
            .send()
            .await?;
        let user: GoTrueUser = check(response).await?.json().await?;
        Ok(user.into_account())
    }

    async fn list_artworks(&self, limit: Option<usize>) -> Result<Vec<ArtworkCard>, BackendError> {
        let select = format!("*,users:artist_id({USER_SUMMARY}),likes:likes(count),comments:comments(count)");
        let mut request = self
            .rest(Method::GET, "artworks", None)
            .query(&[("select", select.as_str()), ("order", "created_at.desc")]);
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }

        let rows: Vec<ArtworkCardRow> = check(request.send().await?).await?.json().await?;
        Ok(rows.into_iter().map(ArtworkCardRow::into_card).collect())
    }

    async fn get_artwork(&self, id: &RecordId) -> Result<Option<ArtworkDetail>, BackendError> {
        let select = format!("*,users:artist_id({USER_SUMMARY})");
        let response = self
            .rest(Method::GET, "artworks", None)
            .query(&[("select", select), ("id", eq(id))])
            .send()
            .await?;

        let rows: Vec<ArtworkDetailRow> = check(response).await?.json().await?;
        Ok(rows.into_iter().next().map(|row| ArtworkDetail {
            artwork: row.artwork,
            artist: row.users,
        }))
    }

    async fn insert_artwork(&self, session: &AuthSession, artwork: NewArtwork) -> Result<Artwork, BackendError> {
        let response = self
            .rest(Method::POST, "artworks", Some(&session.access_token))
            .header("Prefer", "return=representation")
            .json(&[artwork])
            .send()
            .await?;

        let rows: Vec<Artwork> = check(response).await?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode("insert returned no artwork row".to_string()))
    }

    async fn artist_artworks(&self, session: &AuthSession, artist_id: &RecordId) -> Result<Vec<ArtworkEngagement>, BackendError> {
        let select = format!(
            "*,likes:likes(id,users:user_id({USER_SUMMARY})),comments:comments(*,users:user_id({USER_SUMMARY}))"
        );
        let response = self
            .rest(Method::GET, "artworks", Some(&session.access_token))
            .query(&[
                ("select", select),
                ("artist_id", eq(artist_id)),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await?;

        let rows: Vec<EngagementRow> = check(response).await?.json().await?;
        Ok(rows.into_iter().map(EngagementRow::into_engagement).collect())
    }

    async fn profile_artworks(&self, artist_id: &RecordId) -> Result<Vec<Artwork>, BackendError> {
        let response = self
            .rest(Method::GET, "artworks", None)
            .query(&[
                ("select", "*".to_string()),
                ("artist_id", eq(artist_id)),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn count_likes(&self, artwork_id: &RecordId) -> Result<u64, BackendError> {
        let response = self
            .rest(Method::HEAD, "likes", None)
            .header("Prefer", "count=exact")
            .query(&[("select", "id".to_string()), ("artwork_id", eq(artwork_id))])
            .send()
            .await?;

        let response = check(response).await?;
        let range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| BackendError::Decode("missing Content-Range header".to_string()))?;
        parse_content_range_total(range)
            .ok_or_else(|| BackendError::Decode(format!("bad Content-Range: {range}")))
    }

    async fn has_liked(&self, artwork_id: &RecordId, user_id: &RecordId) -> Result<bool, BackendError> {
        let response = self
            .rest(Method::GET, "likes", None)
            .query(&[
                ("select", "id".to_string()),
                ("artwork_id", eq(artwork_id)),
                ("user_id", eq(user_id)),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;

        let rows: Vec<serde_json::Value> = check(response).await?.json().await?;
        Ok(!rows.is_empty())
    }

    async fn insert_like(&self, session: &AuthSession, artwork_id: &RecordId) -> Result<(), BackendError> {
        let response = self
            .rest(Method::POST, "likes", Some(&session.access_token))
            .header("Prefer", "return=minimal")
            .json(&json!({ "artwork_id": artwork_id, "user_id": session.account.id }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn delete_like(&self, session: &AuthSession, artwork_id: &RecordId) -> Result<(), BackendError> {
        let response = self
            .rest(Method::DELETE, "likes", Some(&session.access_token))
            .query(&[("artwork_id", eq(artwork_id)), ("user_id", eq(&session.account.id))])
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn list_comments(&self, artwork_id: &RecordId) -> Result<Vec<CommentWithAuthor>, BackendError> {
        let select = format!("*,users:user_id({USER_SUMMARY})");
        let response = self
            .rest(Method::GET, "comments", None)
            .query(&[
                ("select", select),
                ("artwork_id", eq(artwork_id)),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await?;

        let rows: Vec<CommentRow> = check(response).await?.json().await?;
        Ok(rows.into_iter().map(CommentRow::into_comment).collect())
    }

    async fn insert_comment(&self, session: &AuthSession, comment: NewComment) -> Result<CommentWithAuthor, BackendError> {
        let select = format!("*,users:user_id({USER_SUMMARY})");
        let response = self
            .rest(Method::POST, "comments", Some(&session.access_token))
            .header("Prefer", "return=representation")
            .query(&[("select", select)])
            .json(&[comment])
            .send()
            .await?;

        let rows: Vec<CommentRow> = check(response).await?.json().await?;
        rows.into_iter()
            .next()
            .map(CommentRow::into_comment)
            .ok_or_else(|| BackendError::Decode("insert returned no comment row".to_string()))
    }

    async fn recent_notifications(
        &self,
        session: &AuthSession,
        artist_id: &RecordId,
        limit: usize,
    ) -> Result<Vec<NotificationWithContext>, BackendError> {
        let select = format!("*,users:from_user_id({USER_SUMMARY}),artworks(title)");
        let response = self
            .rest(Method::GET, "notifications", Some(&session.access_token))
            .query(&[
                ("select", select),
                ("artist_id", eq(artist_id)),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;

        let rows: Vec<NotificationRow> = check(response).await?.json().await?;
        Ok(rows.into_iter().map(NotificationRow::into_notification).collect())
    }

    async fn get_profile(&self, id: &RecordId) -> Result<Option<Profile>, BackendError> {
        let response = self
            .rest(Method::GET, "users", None)
            .query(&[("select", "*".to_string()), ("id", eq(id))])
            .send()
            .await?;

        let rows: Vec<Profile> = check(response).await?.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn update_profile_avatar(&self, session: &AuthSession, avatar_url: &str) -> Result<(), BackendError> {
        let response = self
            .rest(Method::PATCH, "users", Some(&session.access_token))
            .header("Prefer", "return=minimal")
            .query(&[("id", eq(&session.account.id))])
            .json(&json!({ "avatar_url": avatar_url }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

/// PostgREST equality filter value
fn eq(id: &RecordId) -> String {
    format!("eq.{id}")
}

/// Pass successful responses through, turn the rest into [`BackendError`]
async fn check(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    tracing::debug!("Backend responded {}: {}", status, message);

    Err(match status.as_u16() {
        401 | 403 => BackendError::Unauthorized(message),
        409 => BackendError::Conflict(message),
        code => BackendError::Api { status: code, message },
    })
}

/// Pull the human-readable message out of a GoTrue or PostgREST error body
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .find(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Total from a `Content-Range` header such as `0-9/42` or `*/0`
fn parse_content_range_total(header: &str) -> Option<u64> {
    let (_, total) = header.trim().rsplit_once('/')?;
    total.parse().ok()
}

// ============================================================================
// Wire rows
// ============================================================================

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: RecordId,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
    #[serde(default)]
    role: Role,
}

impl GoTrueUser {
    fn into_account(self) -> Account {
        let meta = self.user_metadata;
        let name = meta
            .full_name
            .filter(|n| !n.trim().is_empty())
            .or(meta.name.filter(|n| !n.trim().is_empty()));
        Account {
            id: self.id,
            email: self.email.unwrap_or_default(),
            name,
            avatar_url: meta.avatar_url,
            role: meta.role,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: GoTrueUser,
}

impl SessionResponse {
    fn into_session(self) -> AuthSession {
        AuthSession {
            expires_at: session_expiry(self.expires_at, self.expires_in),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            account: self.user.into_account(),
        }
    }
}

fn session_expiry(expires_at: Option<i64>, expires_in: Option<i64>) -> DateTime<Utc> {
    expires_at
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        .unwrap_or_else(|| Utc::now() + Duration::seconds(expires_in.unwrap_or(3600)))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(SessionResponse),
    User(GoTrueUser),
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: u64,
}

fn total(rows: &[CountRow]) -> u64 {
    rows.first().map(|r| r.count).unwrap_or(0)
}

#[derive(Debug, Deserialize)]
struct ArtworkCardRow {
    #[serde(flatten)]
    artwork: Artwork,
    #[serde(default)]
    users: Option<UserSummary>,
    #[serde(default)]
    likes: Vec<CountRow>,
    #[serde(default)]
    comments: Vec<CountRow>,
}

impl ArtworkCardRow {
    fn into_card(self) -> ArtworkCard {
        ArtworkCard {
            like_count: total(&self.likes),
            comment_count: total(&self.comments),
            artwork: self.artwork,
            artist: self.users,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ArtworkDetailRow {
    #[serde(flatten)]
    artwork: Artwork,
    #[serde(default)]
    users: Option<UserSummary>,
}

#[derive(Debug, Deserialize)]
struct CommentRow {
    #[serde(flatten)]
    comment: Comment,
    #[serde(default)]
    users: Option<UserSummary>,
}

impl CommentRow {
    fn into_comment(self) -> CommentWithAuthor {
        CommentWithAuthor {
            comment: self.comment,
            author: self.users,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LikeRow {
    id: RecordId,
    #[serde(default)]
    users: Option<UserSummary>,
}

#[derive(Debug, Deserialize)]
struct EngagementRow {
    #[serde(flatten)]
    artwork: Artwork,
    #[serde(default)]
    likes: Vec<LikeRow>,
    #[serde(default)]
    comments: Vec<CommentRow>,
}

impl EngagementRow {
    fn into_engagement(self) -> ArtworkEngagement {
        ArtworkEngagement {
            artwork: self.artwork,
            likes: self
                .likes
                .into_iter()
                .map(|l| LikeWithUser { id: l.id, user: l.users })
                .collect(),
            comments: self.comments.into_iter().map(CommentRow::into_comment).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ArtworkTitle {
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NotificationRow {
    #[serde(flatten)]
    notification: Notification,
    #[serde(default)]
    users: Option<UserSummary>,
    #[serde(default)]
    artworks: Option<ArtworkTitle>,
}

impl NotificationRow {
    fn into_notification(self) -> NotificationWithContext {
        NotificationWithContext {
            notification: self.notification,
            from_user: self.users,
            artwork_title: self.artworks.and_then(|a| a.title),
        }
    }
}
