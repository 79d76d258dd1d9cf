//! Session service
//!
//! Owns everything about the signed-in account: sign-up, sign-in,
//! sign-out, password recovery and re-applying a persisted session on each
//! request. There is no process-wide "current user"; callers pass the
//! session they decoded from the request.
//!
//! Every change of auth state is published as an [`AuthEvent`].

use tokio::sync::broadcast;

use crate::backend::{AccountUpdate, BackendError, DynStore, SignUpOutcome, SignUpRequest};
use crate::models::{AuthSession, RecordId, Role};
use crate::services::validation::{self, ValidationError};

/// Capacity of the auth event channel
const AUTH_EVENT_CAPACITY: usize = 64;

/// Auth state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(RecordId),
    SignedOut(RecordId),
    TokenRefreshed(RecordId),
    UserUpdated(RecordId),
    PasswordRecovery(RecordId),
    /// A persisted session could not be refreshed and was dropped
    SessionLost(RecordId),
}

impl AuthEvent {
    pub fn account_id(&self) -> &RecordId {
        match self {
            AuthEvent::SignedIn(id)
            | AuthEvent::SignedOut(id)
            | AuthEvent::TokenRefreshed(id)
            | AuthEvent::UserUpdated(id)
            | AuthEvent::PasswordRecovery(id)
            | AuthEvent::SessionLost(id) => id,
        }
    }
}

/// Error types for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Email is already registered. Please use another email.")]
    EmailTaken,

    #[error("{0}")]
    Backend(#[from] BackendError),
}

/// Outcome of re-applying a persisted session
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// Still valid, unchanged
    Valid(AuthSession),
    /// Expired and refreshed; the new session must be persisted
    Refreshed(AuthSession),
    /// Expired and the backend could not be reached; keep it and retry
    Unavailable(AuthSession),
    /// Expired and the refresh was rejected; the persisted session must be cleared
    Lost,
}

impl Resolved {
    pub fn session(&self) -> Option<&AuthSession> {
        match self {
            Resolved::Valid(s) | Resolved::Refreshed(s) => Some(s),
            Resolved::Unavailable(_) | Resolved::Lost => None,
        }
    }
}

/// Session service
pub struct SessionService {
    store: DynStore,
    events: broadcast::Sender<AuthEvent>,
    reset_redirect: String,
}

impl SessionService {
    pub fn new(store: DynStore, reset_redirect: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            store,
            events,
            reset_redirect: reset_redirect.into(),
        }
    }

    /// Subscribe to auth state changes from now on
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: AuthEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Register a new account.
    ///
    /// Name, email and password are validated locally first.
    pub async fn sign_up(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<SignUpOutcome, SessionError> {
        validation::validate_sign_up(name, email, password)?;

        let request = SignUpRequest {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
            role,
        };

        let outcome = self.store.sign_up(request).await.map_err(|e| {
            if is_already_registered(&e) {
                SessionError::EmailTaken
            } else {
                SessionError::Backend(e)
            }
        })?;

        tracing::info!("Account registered: {} ({})", outcome.account.email, role);
        if let Some(session) = &outcome.session {
            self.publish(AuthEvent::SignedIn(session.account.id.clone()));
        }
        Ok(outcome)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, SessionError> {
        let session = self.store.sign_in(email.trim(), password).await?;
        self.publish(AuthEvent::SignedIn(session.account.id.clone()));
        Ok(session)
    }

    /// Sign out remotely if possible; the caller clears the local session regardless
    pub async fn sign_out(&self, session: &AuthSession) {
        if let Err(e) = self.store.sign_out(session).await {
            tracing::warn!("Remote sign-out failed: {}", e);
        }
        self.publish(AuthEvent::SignedOut(session.account.id.clone()));
    }

    /// Send the password-reset email
    pub async fn request_password_reset(&self, email: &str) -> Result<(), SessionError> {
        let email = email.trim();
        if !validation::is_valid_email(email) {
            return Err(ValidationError::InvalidEmail.into());
        }
        self.store
            .request_password_reset(email, &self.reset_redirect)
            .await?;
        Ok(())
    }

    /// Exchange the token from a reset link for a session
    pub async fn verify_recovery(&self, token_hash: &str) -> Result<AuthSession, SessionError> {
        let session = self.store.verify_recovery(token_hash).await?;
        self.publish(AuthEvent::PasswordRecovery(session.account.id.clone()));
        Ok(session)
    }

    /// Set a new password for the signed-in account.
    ///
    /// `min_len` is enforced only where the form asks for it.
    pub async fn update_password(
        &self,
        session: &AuthSession,
        password: &str,
        confirm: &str,
        min_len: Option<usize>,
    ) -> Result<AuthSession, SessionError> {
        validation::validate_new_password(password, confirm, min_len)?;

        let account = self
            .store
            .update_account(
                session,
                AccountUpdate {
                    password: Some(password.to_string()),
                    ..AccountUpdate::default()
                },
            )
            .await?;

        self.publish(AuthEvent::UserUpdated(account.id.clone()));
        Ok(AuthSession {
            account,
            ..session.clone()
        })
    }

    /// Record a new avatar URL in the account metadata
    pub async fn update_avatar(&self, session: &AuthSession, avatar_url: &str) -> Result<AuthSession, SessionError> {
        let account = self
            .store
            .update_account(
                session,
                AccountUpdate {
                    avatar_url: Some(avatar_url.to_string()),
                    ..AccountUpdate::default()
                },
            )
            .await?;

        self.publish(AuthEvent::UserUpdated(account.id.clone()));
        Ok(AuthSession {
            account,
            ..session.clone()
        })
    }

    /// Re-apply a persisted session, refreshing it when the access token expired
    pub async fn resolve(&self, session: AuthSession) -> Resolved {
        if !session.is_expired() {
            return Resolved::Valid(session);
        }

        match self.store.refresh_session(&session.refresh_token).await {
            Ok(refreshed) => {
                tracing::debug!("Refreshed session for {}", refreshed.account.id);
                self.publish(AuthEvent::TokenRefreshed(refreshed.account.id.clone()));
                Resolved::Refreshed(refreshed)
            }
            Err(BackendError::Transport(e)) => {
                tracing::warn!("Backend unreachable while refreshing {}: {}", session.account.id, e);
                Resolved::Unavailable(session)
            }
            Err(e) => {
                tracing::warn!("Session refresh failed for {}: {}", session.account.id, e);
                self.publish(AuthEvent::SessionLost(session.account.id.clone()));
                Resolved::Lost
            }
        }
    }
}

/// The hosted service reports duplicate emails as 422 or by message
fn is_already_registered(e: &BackendError) -> bool {
    e.status() == Some(422) || e.to_string().to_lowercase().contains("already registered")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStore;
    use std::sync::Arc;

    fn service(store: Arc<MemoryStore>) -> SessionService {
        SessionService::new(store, "http://localhost:8080/update-password")
    }

    #[tokio::test]
    async fn test_sign_up_validation_makes_no_backend_call() {
        let store = Arc::new(MemoryStore::new());
        let sessions = service(store.clone());

        let err = sessions
            .sign_up("Ayu", "ayu@x.id", "weakpass", Role::User)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Validation(ValidationError::WeakPassword)));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_email_maps_to_email_taken() {
        let store = Arc::new(MemoryStore::new());
        let sessions = service(store.clone());

        sessions
            .sign_up("Ayu", "ayu@x.id", "Rahasia#1", Role::Artist)
            .await
            .unwrap();
        let err = sessions
            .sign_up("Ayu Dua", "ayu@x.id", "Rahasia#1", Role::User)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::EmailTaken));
    }

    #[tokio::test]
    async fn test_sign_up_keeps_role() {
        let store = Arc::new(MemoryStore::new());
        let sessions = service(store.clone());

        let outcome = sessions
            .sign_up("  Rani  ", "rani@x.id", "Rahasia#1", Role::Artist)
            .await
            .unwrap();
        assert!(outcome.account.is_artist());
        assert_eq!(outcome.account.name.as_deref(), Some("Rani"));
    }

    #[tokio::test]
    async fn test_events_are_broadcast_in_order() {
        let store = Arc::new(MemoryStore::new());
        let sessions = service(store.clone());
        let account = store.seed_account("Ayu", "ayu@x.id", "Rahasia#1", Role::User).await;
        let mut rx = sessions.subscribe();

        let session = sessions.sign_in("ayu@x.id", "Rahasia#1").await.unwrap();
        sessions.sign_out(&session).await;

        assert_eq!(rx.recv().await.unwrap(), AuthEvent::SignedIn(account.id.clone()));
        assert_eq!(rx.recv().await.unwrap(), AuthEvent::SignedOut(account.id));
    }

    #[tokio::test]
    async fn test_resolve_valid_session_makes_no_call() {
        let store = Arc::new(MemoryStore::new());
        let sessions = service(store.clone());
        store.seed_account("Ayu", "ayu@x.id", "Rahasia#1", Role::User).await;
        let session = sessions.sign_in("ayu@x.id", "Rahasia#1").await.unwrap();
        let calls = store.call_count();

        let resolved = sessions.resolve(session.clone()).await;
        assert_eq!(resolved, Resolved::Valid(session));
        assert_eq!(store.call_count(), calls);
    }

    #[tokio::test]
    async fn test_resolve_refreshes_expired_session() {
        let store = Arc::new(MemoryStore::with_token_ttl(chrono::Duration::seconds(-1)));
        let sessions = service(store.clone());
        store.seed_account("Ayu", "ayu@x.id", "Rahasia#1", Role::User).await;
        let expired = sessions.sign_in("ayu@x.id", "Rahasia#1").await.unwrap();
        let mut rx = sessions.subscribe();

        match sessions.resolve(expired.clone()).await {
            Resolved::Refreshed(fresh) => {
                assert_ne!(fresh.access_token, expired.access_token);
                assert!(!fresh.is_expired());
            }
            other => panic!("expected refresh, got {:?}", other),
        }
        assert!(matches!(rx.recv().await.unwrap(), AuthEvent::TokenRefreshed(_)));
    }

    #[tokio::test]
    async fn test_resolve_failed_refresh_loses_session() {
        let store = Arc::new(MemoryStore::with_token_ttl(chrono::Duration::seconds(-1)));
        let sessions = service(store.clone());
        store.seed_account("Ayu", "ayu@x.id", "Rahasia#1", Role::User).await;
        let mut expired = sessions.sign_in("ayu@x.id", "Rahasia#1").await.unwrap();
        expired.refresh_token = "revoked".into();

        assert_eq!(sessions.resolve(expired).await, Resolved::Lost);
    }

    #[tokio::test]
    async fn test_resolve_keeps_session_when_backend_unreachable() {
        let store = Arc::new(MemoryStore::with_token_ttl(chrono::Duration::seconds(-1)));
        let sessions = service(store.clone());
        store.seed_account("Ayu", "ayu@x.id", "Rahasia#1", Role::User).await;
        let expired = sessions.sign_in("ayu@x.id", "Rahasia#1").await.unwrap();
        store.set_offline(true);

        let resolved = sessions.resolve(expired.clone()).await;
        assert_eq!(resolved, Resolved::Unavailable(expired));
        assert!(resolved.session().is_none());
    }

    #[tokio::test]
    async fn test_password_reset_uses_configured_redirect() {
        let store = Arc::new(MemoryStore::new());
        let sessions = service(store.clone());

        sessions.request_password_reset("ayu@x.id").await.unwrap();
        assert_eq!(
            store.reset_requests().await,
            vec![("ayu@x.id".to_string(), "http://localhost:8080/update-password".to_string())]
        );
    }

    #[tokio::test]
    async fn test_recovery_then_password_update() {
        let store = Arc::new(MemoryStore::new());
        let sessions = service(store.clone());
        store.seed_account("Ayu", "ayu@x.id", "Rahasia#1", Role::User).await;
        sessions.request_password_reset("ayu@x.id").await.unwrap();
        let token = store.recovery_token_for("ayu@x.id").await.unwrap();

        let session = sessions.verify_recovery(&token).await.unwrap();
        sessions
            .update_password(&session, "Baru#2024", "Baru#2024", None)
            .await
            .unwrap();

        assert!(sessions.sign_in("ayu@x.id", "Rahasia#1").await.is_err());
        assert!(sessions.sign_in("ayu@x.id", "Baru#2024").await.is_ok());
    }

    #[tokio::test]
    async fn test_password_mismatch_makes_no_call() {
        let store = Arc::new(MemoryStore::new());
        let sessions = service(store.clone());
        store.seed_account("Ayu", "ayu@x.id", "Rahasia#1", Role::User).await;
        let session = sessions.sign_in("ayu@x.id", "Rahasia#1").await.unwrap();
        let calls = store.call_count();

        let err = sessions
            .update_password(&session, "abcdef", "abcdeg", Some(6))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Validation(ValidationError::PasswordMismatch)));
        assert_eq!(store.call_count(), calls);
    }

    #[test]
    fn test_already_registered_detection() {
        assert!(is_already_registered(&BackendError::Api {
            status: 422,
            message: "x".into()
        }));
        assert!(is_already_registered(&BackendError::Api {
            status: 400,
            message: "User already registered".into()
        }));
        assert!(!is_already_registered(&BackendError::Transport("down".into())));
    }
}
