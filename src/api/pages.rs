//! Page handlers
//!
//! Read-only pages: landing, gallery, artwork detail, dashboard, upload
//! form, profile and the not-found fallback.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use std::collections::HashMap;
use tera::Context as TeraContext;

use crate::api::common::{gallery_query, upload_options};
use crate::api::guard::login_url;
use crate::api::middleware::{AppState, Page};
use crate::models::{AuthSession, NotificationWithContext, RecordId};
use crate::services::{DashboardError, GalleryPage};

/// Notification line of the dashboard feed
#[derive(Serialize)]
struct FeedItem<'a> {
    #[serde(flatten)]
    notification: &'a NotificationWithContext,
    verb: &'static str,
}

/// Session of a guarded page; the guard layer makes `None` unreachable
pub(crate) fn signed_in(page: &Page) -> Result<&AuthSession, Response> {
    page.session
        .as_ref()
        .ok_or_else(|| Redirect::to(&login_url(&page.path)).into_response())
}

/// GET / - Landing page with the newest artworks
pub async fn home(State(state): State<AppState>, page: Page) -> Response {
    let mut context = TeraContext::new();
    match state.gallery.recent_artworks().await {
        Ok(artworks) => context.insert("artworks", &artworks),
        Err(e) => {
            tracing::error!("Failed to load recent artworks: {}", e);
            context.insert("artworks", &Vec::<()>::new());
            context.insert("load_error", "Could not load the latest artworks.");
        }
    }
    state.render(&page, "home.html", &context)
}

/// GET /gallery - Browse with search, category filter and pagination
pub async fn gallery(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    page: Page,
) -> Response {
    let query = gallery_query(&params);
    let viewer = page.auth.account().map(|a| a.id.clone());
    let mut context = TeraContext::new();
    context.insert("query", &query);

    match state.gallery.browse(&query, viewer.as_ref()).await {
        Ok(result) => context.insert("result", &result),
        Err(e) => {
            tracing::error!("Failed to load gallery: {}", e);
            context.insert(
                "result",
                &GalleryPage {
                    items: Vec::new(),
                    page: query.page,
                    total_pages: 0,
                    total_items: 0,
                    categories: Vec::new(),
                },
            );
            context.insert("load_error", "Could not load the gallery. Please try again.");
        }
    }
    state.render(&page, "gallery.html", &context)
}

/// GET /gallery/{id} - Artwork detail with likes and comments
pub async fn artwork(State(state): State<AppState>, Path(id): Path<String>, page: Page) -> Response {
    let id = RecordId::from(id);
    let viewer = page.auth.account().map(|a| a.id.clone());

    let view = match state.gallery.artwork_detail(&id, viewer.as_ref()).await {
        Ok(Some(view)) => view,
        Ok(None) => return state.not_found(&page),
        Err(e) => {
            tracing::error!("Failed to load artwork {}: {}", id, e);
            return state.error_page(&page, StatusCode::BAD_GATEWAY, "Could not load this artwork.");
        }
    };

    let mut context = TeraContext::new();
    context.insert("artwork", &view.artwork);
    context.insert("like", &view.like);
    match state.engagement.comments(&id).await {
        Ok(comments) => context.insert("comments", &comments),
        Err(e) => {
            tracing::warn!("Failed to load comments for {}: {}", id, e);
            context.insert("comments", &Vec::<()>::new());
            context.insert("comments_error", "Could not load comments.");
        }
    }
    state.render(&page, "artwork.html", &context)
}

/// GET /dashboard - Artist dashboard
pub async fn dashboard(State(state): State<AppState>, page: Page) -> Response {
    let session = match signed_in(&page) {
        Ok(session) => session,
        Err(redirect) => return redirect,
    };

    match state.dashboard.load(session).await {
        Ok(view) => {
            let mut context = TeraContext::new();
            context.insert("dashboard", &view);
            let feed: Vec<FeedItem> = view
                .notifications
                .iter()
                .map(|n| FeedItem {
                    notification: n,
                    verb: n.verb(),
                })
                .collect();
            context.insert("feed", &feed);
            state.render(&page, "dashboard.html", &context)
        }
        Err(DashboardError::NotArtist) => Redirect::to("/").into_response(),
        Err(e) => {
            tracing::error!("Failed to load dashboard for {}: {}", session.account.id, e);
            state.error_page(&page, StatusCode::BAD_GATEWAY, "Could not load your dashboard.")
        }
    }
}

/// GET /upload - Upload form
pub async fn upload_form(State(state): State<AppState>, page: Page) -> Response {
    let mut context = upload_options(&state.uploads);
    context.insert("form", &HashMap::<String, String>::new());
    state.render(&page, "upload.html", &context)
}

/// GET /profile/{id} - Profile with the artist's works
pub async fn profile(State(state): State<AppState>, Path(id): Path<String>, page: Page) -> Response {
    let id = RecordId::from(id);
    let viewer = page.auth.account().map(|a| a.id.clone());

    match state.profiles.view(&id, viewer.as_ref()).await {
        Ok(Some(view)) => {
            let mut context = TeraContext::new();
            context.insert("view", &view);
            context.insert("display_name", view.profile.display_name());
            state.render(&page, "profile.html", &context)
        }
        Ok(None) => state.not_found(&page),
        Err(e) => {
            tracing::error!("Failed to load profile {}: {}", id, e);
            state.error_page(&page, StatusCode::BAD_GATEWAY, "Could not load this profile.")
        }
    }
}

/// Fallback for unknown paths
pub async fn not_found(State(state): State<AppState>, page: Page) -> Response {
    state.not_found(&page)
}
