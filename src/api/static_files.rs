//! Static file serving
//!
//! Stylesheet and scripts are embedded in the binary. In demo mode, files
//! held by the in-memory uploader are served as well.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;

use crate::api::middleware::AppState;

/// Embedded static assets
#[derive(RustEmbed)]
#[folder = "assets/"]
#[include = "*"]
struct Assets;

/// GET /assets/{*path}
pub async fn serve_asset(Path(path): Path<String>) -> Response {
    let decoded = urlencoding::decode(&path).map(|p| p.into_owned()).unwrap_or(path);
    match Assets::get(decoded.trim_start_matches('/')) {
        Some(content) => build_response(&decoded, content.data.into_owned()),
        None => not_found(),
    }
}

/// GET /demo-media/{key}
pub async fn serve_demo_media(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    let Some(media) = state.demo_media.as_ref() else {
        return not_found();
    };
    match media.get(&key).await {
        Some(stored) => (
            [
                (header::CONTENT_TYPE, stored.content_type),
                (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
            ],
            Body::from(stored.bytes),
        )
            .into_response(),
        None => not_found(),
    }
}

fn build_response(path: &str, data: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, get_content_type(path)),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        Body::from(data),
    )
        .into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

fn get_content_type(path: &str) -> &'static str {
    match path.rsplit('.').next().unwrap_or("") {
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "ico" => "image/x-icon",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types() {
        assert_eq!(get_content_type("app.css"), "text/css; charset=utf-8");
        assert_eq!(get_content_type("app.js"), "application/javascript");
        assert_eq!(get_content_type("LICENSE"), "application/octet-stream");
    }

    #[test]
    fn test_stylesheet_is_embedded() {
        assert!(Assets::get("app.css").is_some());
    }
}
