//! HTTP layer - page handlers and routing
//!
//! This module contains every route of the Exhibitly front-end:
//! - Public pages (landing, gallery, auth forms)
//! - Signed-in pages (artwork detail, profiles)
//! - Artist pages (dashboard, upload)
//! - Like, comment and theme actions
//! - Embedded static assets

pub mod auth;
pub mod common;
pub mod engagement;
pub mod flash;
pub mod guard;
pub mod middleware;
pub mod pages;
pub mod profile;
pub mod session;
pub mod static_files;
pub mod theme;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

pub use guard::{guard, AuthState, GuardDecision, RouteAccess};
pub use middleware::{ApiError, AppState, CurrentSession, Page};

/// Slack for multipart framing and text fields on top of the file itself
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Build the page router
pub fn build_page_router(state: AppState) -> Router<AppState> {
    let upload_limit = DefaultBodyLimit::max(
        usize::try_from(state.config.media.max_file_size)
            .unwrap_or(usize::MAX)
            .saturating_add(MULTIPART_OVERHEAD),
    );

    // Artist-only routes
    let artist_routes = Router::new()
        .route("/dashboard", get(pages::dashboard))
        .route("/upload", get(pages::upload_form).post(upload::submit))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), middleware::require_artist));

    // Signed-in routes
    let protected_routes = Router::new()
        .route("/gallery/{id}", get(pages::artwork))
        .route("/profile/{id}", get(pages::profile))
        .route("/profile/{id}/avatar", post(profile::change_avatar))
        .route("/profile/{id}/password", post(profile::change_password))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), middleware::require_auth));

    // Public routes
    Router::new()
        .route("/", get(pages::home))
        .route("/gallery", get(pages::gallery))
        .route("/gallery/{id}/like", post(engagement::toggle_like))
        .route("/gallery/{id}/comments", post(engagement::post_comment))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route("/logout", post(auth::logout))
        .route("/reset-password", get(auth::reset_page).post(auth::request_reset))
        .route("/update-password", get(auth::update_password_page).post(auth::update_password))
        .route("/theme/toggle", post(theme::toggle))
        .merge(artist_routes)
        .merge(protected_routes)
        .fallback(pages::not_found)
        .layer(upload_limit)
        .layer(axum_middleware::from_fn_with_state(state, middleware::resolve_session))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/assets/{*path}", get(static_files::serve_asset))
        .route("/demo-media/{key}", get(static_files::serve_demo_media))
        .merge(build_page_router(state.clone()))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
