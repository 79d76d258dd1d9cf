//! Auth session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Account;

/// Session issued by the hosted auth service.
///
/// Persisted client-side (signed cookie) and re-applied on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub account: Account,
}

impl AuthSession {
    /// Check if the access token has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}
