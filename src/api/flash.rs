//! One-shot flash alerts
//!
//! A redirect sets the flash cookie; the next rendered page shows it and
//! clears the cookie.

use axum::http::HeaderMap;
use data_encoding::BASE64URL_NOPAD;

use crate::api::session::{cookie_header, read_cookie};
use crate::theme::Flash;

pub const FLASH_COOKIE: &str = "exhibitly_flash";

/// Flash carried by the request, if any
pub fn read(headers: &HeaderMap) -> Option<Flash> {
    let raw = read_cookie(headers, FLASH_COOKIE)?;
    let json = BASE64URL_NOPAD.decode(raw.as_bytes()).ok()?;
    serde_json::from_slice(&json).ok()
}

/// `Set-Cookie` value carrying `flash` to the next page
pub fn set(flash: &Flash) -> Option<String> {
    let json = serde_json::to_vec(flash).ok()?;
    Some(cookie_header(FLASH_COOKIE, &BASE64URL_NOPAD.encode(&json), Some(60), false))
}

pub fn clear() -> String {
    cookie_header(FLASH_COOKIE, "", Some(0), false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    #[test]
    fn test_flash_survives_cookie_trip() {
        let cookie = set(&Flash::error("Upload failed: offline")).unwrap();
        let value = cookie.split(';').next().unwrap().to_string();

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(&value).unwrap());
        assert_eq!(read(&headers), Some(Flash::error("Upload failed: offline")));
    }

    #[test]
    fn test_garbage_flash_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("exhibitly_flash=%%%"));
        assert_eq!(read(&headers), None);
    }
}
