//! Session cookie
//!
//! The cookie carries the JSON-serialized [`AuthSession`], base64url
//! encoded and signed with HMAC-SHA256 as `payload.signature`. Anything that
//! fails to verify or decode is treated as no cookie at all.

use axum::http::{header, HeaderMap};
use data_encoding::BASE64URL_NOPAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::SessionConfig;
use crate::models::AuthSession;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    #[error("Failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid signing key")]
    Key,
}

/// Signs and verifies session cookie payloads
pub struct CookieSigner {
    key: Vec<u8>,
}

impl CookieSigner {
    /// Signer keyed on `secret`; an empty secret gets a random per-process key
    pub fn new(secret: &str) -> Self {
        let key = if secret.is_empty() {
            tracing::warn!("No session secret configured; sessions will not survive a restart");
            let mut key = uuid::Uuid::new_v4().as_bytes().to_vec();
            key.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
            key
        } else {
            secret.as_bytes().to_vec()
        };
        Self { key }
    }

    fn mac(&self) -> Result<HmacSha256, CookieError> {
        HmacSha256::new_from_slice(&self.key).map_err(|_| CookieError::Key)
    }

    pub fn encode(&self, session: &AuthSession) -> Result<String, CookieError> {
        let payload = BASE64URL_NOPAD.encode(&serde_json::to_vec(session)?);
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = BASE64URL_NOPAD.encode(&mac.finalize().into_bytes());
        Ok(format!("{}.{}", payload, signature))
    }

    pub fn decode(&self, value: &str) -> Option<AuthSession> {
        let (payload, signature) = value.split_once('.')?;
        let signature = BASE64URL_NOPAD.decode(signature.as_bytes()).ok()?;

        let mut mac = self.mac().ok()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let json = BASE64URL_NOPAD.decode(payload.as_bytes()).ok()?;
        serde_json::from_slice(&json).ok()
    }
}

/// Builds `Set-Cookie` values for the session cookie
pub struct SessionCookies {
    name: String,
    max_age_secs: u64,
    secure: bool,
    signer: CookieSigner,
}

impl SessionCookies {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            name: config.cookie_name.clone(),
            max_age_secs: config.max_age_secs,
            secure: config.secure,
            signer: CookieSigner::new(&config.secret),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Session from the request cookie, if present and intact
    pub fn read(&self, headers: &HeaderMap) -> Option<AuthSession> {
        let raw = read_cookie(headers, &self.name)?;
        let session = self.signer.decode(raw);
        if session.is_none() {
            tracing::debug!("Ignoring tampered or malformed session cookie");
        }
        session
    }

    /// Whether the request carries a session cookie at all
    pub fn is_present(&self, headers: &HeaderMap) -> bool {
        read_cookie(headers, &self.name).is_some()
    }

    pub fn set(&self, session: &AuthSession) -> Result<String, CookieError> {
        let value = self.signer.encode(session)?;
        Ok(cookie_header(&self.name, &value, Some(self.max_age_secs), self.secure))
    }

    pub fn clear(&self) -> String {
        cookie_header(&self.name, "", Some(0), self.secure)
    }
}

/// `Set-Cookie` value with the attributes every Exhibitly cookie shares
pub fn cookie_header(name: &str, value: &str, max_age_secs: Option<u64>, secure: bool) -> String {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", name, value);
    if let Some(max_age) = max_age_secs {
        cookie.push_str(&format!("; Max-Age={}", max_age));
    }
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Value of cookie `name` from the request's `Cookie` headers
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|s| s.split(';'))
        .filter_map(|c| c.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value)
}
