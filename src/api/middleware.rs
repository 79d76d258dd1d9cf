//! API middleware
//!
//! Contains:
//! - Application state shared by every handler
//! - Session resolution (decode the cookie, refresh it, re-set or clear it)
//! - Route guards for signed-in and artist-only pages
//! - Page rendering and error responses

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tera::Context as TeraContext;

use crate::api::flash;
use crate::api::guard::{guard, login_url, AuthState, GuardDecision, RouteAccess};
use crate::api::session::{read_cookie, SessionCookies};
use crate::backend::DynStore;
use crate::config::Config;
use crate::media::{DynUploader, MemoryUploader};
use crate::models::AuthSession;
use crate::services::{
    DashboardService, EngagementService, GalleryService, ProfileService, Resolved, SessionService, UploadService,
};
use crate::theme::{Flash, StandardTemplateVars, Theme, ThemeEngine, ThemeError, COLOR_SCHEME_HINT, THEME_COOKIE};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionService>,
    pub gallery: Arc<GalleryService>,
    pub engagement: Arc<EngagementService>,
    pub uploads: Arc<UploadService>,
    pub dashboard: Arc<DashboardService>,
    pub profiles: Arc<ProfileService>,
    pub theme_engine: Arc<ThemeEngine>,
    pub cookies: Arc<SessionCookies>,
    /// In-memory media served under `/demo-media/{key}`
    pub demo_media: Option<Arc<MemoryUploader>>,
}

impl AppState {
    /// Wire every service onto the two backend ports
    pub fn new(config: Config, store: DynStore, uploader: DynUploader) -> Result<Self, ThemeError> {
        let sessions = Arc::new(SessionService::new(store.clone(), config.password_reset_redirect()));
        let gallery = Arc::new(GalleryService::new(
            store.clone(),
            config.gallery.page_size,
            config.gallery.recent_limit,
        ));
        let engagement = Arc::new(EngagementService::new(store.clone()));
        let uploads = Arc::new(UploadService::new(
            store.clone(),
            uploader.clone(),
            config.gallery.categories.clone(),
            config.media.max_file_size,
        ));
        let dashboard = Arc::new(DashboardService::new(store.clone(), config.gallery.notification_limit));
        let profiles = Arc::new(ProfileService::new(
            store,
            uploader,
            sessions.clone(),
            config.media.max_file_size,
        ));

        Ok(Self {
            cookies: Arc::new(SessionCookies::new(&config.session)),
            theme_engine: Arc::new(ThemeEngine::new()?),
            config: Arc::new(config),
            sessions,
            gallery,
            engagement,
            uploads,
            dashboard,
            profiles,
            demo_media: None,
        })
    }

    pub fn with_demo_media(mut self, media: Arc<MemoryUploader>) -> Self {
        self.demo_media = Some(media);
        self
    }

    /// Render a page with status 200
    pub fn render(&self, page: &Page, template: &str, context: &TeraContext) -> Response {
        self.render_status(StatusCode::OK, page, template, context)
    }

    /// Render a page; a pending flash is consumed
    pub fn render_status(&self, status: StatusCode, page: &Page, template: &str, context: &TeraContext) -> Response {
        let html = self
            .theme_engine
            .render_with_fallback(template, context, &page.template_vars());
        let mut response = (status, Html(html)).into_response();
        if page.flash.is_some() {
            append_cookie(&mut response, &flash::clear());
        }
        response
    }

    pub fn not_found(&self, page: &Page) -> Response {
        self.render_status(StatusCode::NOT_FOUND, page, "not_found.html", &TeraContext::new())
    }

    pub fn error_page(&self, page: &Page, status: StatusCode, message: &str) -> Response {
        let mut context = TeraContext::new();
        context.insert("error_message", message);
        context.insert("status", &status.as_u16());
        self.render_status(status, page, "error.html", &context)
    }

    /// Redirect that also persists `session` in the cookie
    pub fn redirect_signed_in(&self, to: &str, session: &AuthSession, flash: Option<Flash>) -> Response {
        let mut response = match flash {
            Some(flash) => redirect_with_flash(to, flash),
            None => Redirect::to(to).into_response(),
        };
        match self.cookies.set(session) {
            Ok(cookie) => append_cookie(&mut response, &cookie),
            Err(e) => tracing::error!("Failed to persist session: {}", e),
        }
        response
    }
}

/// Session of the current request, resolved once by [`resolve_session`]
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub auth: AuthState,
    pub session: Option<AuthSession>,
}

impl CurrentSession {
    pub fn anonymous() -> Self {
        Self {
            auth: AuthState::Resolved(None),
            session: None,
        }
    }

    fn signed_in(session: AuthSession) -> Self {
        Self {
            auth: AuthState::Resolved(Some(session.account.clone())),
            session: Some(session),
        }
    }

    fn pending() -> Self {
        Self {
            auth: AuthState::Pending,
            session: None,
        }
    }
}

/// Everything a page handler needs about the request besides its own input
#[derive(Debug, Clone)]
pub struct Page {
    pub auth: AuthState,
    pub session: Option<AuthSession>,
    pub theme: Theme,
    pub flash: Option<Flash>,
    /// Path and query of the request
    pub path: String,
}

impl Page {
    pub fn from_request(headers: &HeaderMap, path: &str, current: CurrentSession) -> Self {
        let theme = Theme::initial(
            read_cookie(headers, THEME_COOKIE),
            headers.get(COLOR_SCHEME_HINT).and_then(|v| v.to_str().ok()),
        );
        Self {
            auth: current.auth,
            session: current.session,
            theme,
            flash: flash::read(headers),
            path: path.to_string(),
        }
    }

    pub fn template_vars(&self) -> StandardTemplateVars {
        StandardTemplateVars::new(self.path.clone(), self.theme)
            .with_account(self.auth.account())
            .with_flash(self.flash.clone())
    }
}

impl<S> FromRequestParts<S> for Page
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let current = parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .unwrap_or_else(CurrentSession::anonymous);
        let path = parts.uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
        Ok(Page::from_request(&parts.headers, path, current))
    }
}

/// Decode and re-apply the persisted session for every page request.
///
/// A refreshed session is written back; a lost or unreadable one is cleared,
/// unless the handler already set the session cookie itself.
pub async fn resolve_session(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let present = state.cookies.is_present(request.headers());
    let persisted = state.cookies.read(request.headers());

    let (current, cookie_update) = match persisted {
        None => (CurrentSession::anonymous(), present.then(|| state.cookies.clear())),
        Some(session) => match state.sessions.resolve(session).await {
            Resolved::Valid(session) => (CurrentSession::signed_in(session), None),
            Resolved::Refreshed(session) => {
                let cookie = state
                    .cookies
                    .set(&session)
                    .map_err(|e| tracing::error!("Failed to persist refreshed session: {}", e))
                    .ok();
                (CurrentSession::signed_in(session), cookie)
            }
            Resolved::Unavailable(_) => (CurrentSession::pending(), None),
            Resolved::Lost => (CurrentSession::anonymous(), Some(state.cookies.clear())),
        },
    };

    request.extensions_mut().insert(current);
    let mut response = next.run(request).await;

    if let Some(cookie) = cookie_update {
        if !sets_cookie(&response, state.cookies.name()) {
            append_cookie(&mut response, &cookie);
        }
    }
    response
}

/// Signed-in pages
pub async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    enforce(RouteAccess::RequireAuth, &state, request, next).await
}

/// Artist-only pages
pub async fn require_artist(State(state): State<AppState>, request: Request, next: Next) -> Response {
    enforce(RouteAccess::RequireArtist, &state, request, next).await
}

async fn enforce(access: RouteAccess, state: &AppState, request: Request, next: Next) -> Response {
    let current = request
        .extensions()
        .get::<CurrentSession>()
        .cloned()
        .unwrap_or_else(CurrentSession::anonymous);
    let path = request
        .uri()
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    match guard(access, &current.auth, &path) {
        GuardDecision::Render => next.run(request).await,
        GuardDecision::Loading => {
            let page = Page::from_request(request.headers(), &path, current);
            state.render(&page, "loading.html", &TeraContext::new())
        }
        GuardDecision::RedirectToLogin { from } => {
            tracing::debug!("Anonymous request to {}, redirecting to login", from);
            Redirect::to(&login_url(&from)).into_response()
        }
        GuardDecision::RedirectHome => Redirect::to("/").into_response(),
    }
}

/// 303 redirect carrying a one-shot alert
pub fn redirect_with_flash(to: &str, flash: Flash) -> Response {
    let mut response = Redirect::to(to).into_response();
    if let Some(cookie) = flash::set(&flash) {
        append_cookie(&mut response, &cookie);
    }
    response
}

pub fn append_cookie(response: &mut Response, cookie: &str) {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::error!("Invalid Set-Cookie value: {}", e),
    }
}

fn sets_cookie(response: &Response, name: &str) -> bool {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&prefix))
}

/// Whether the client asked for JSON rather than a page
pub fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("application/json"))
        .unwrap_or(false)
}

/// Error response for JSON clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(code: impl Into<String>, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Anonymous viewer; `details.login_url` returns to `return_to`
    pub fn login_required(return_to: &str) -> Self {
        Self::with_details(
            "UNAUTHORIZED",
            "Please log in to continue",
            serde_json::json!({ "login_url": login_url(return_to) }),
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn upstream_error(message: impl Into<String>) -> Self {
        Self::new("UPSTREAM_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "UPSTREAM_ERROR" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}
