//! Authentication pages
//!
//! Login, sign-up, logout, password-reset request and password update.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::api::guard::post_login_target;
use crate::api::middleware::{append_cookie, redirect_with_flash, AppState, Page};
use crate::backend::BackendError;
use crate::models::Role;
use crate::services::{PasswordChecks, SessionError};
use crate::theme::Flash;

/// Message shown for a failed auth call
fn error_message(e: &SessionError) -> String {
    match e {
        SessionError::Backend(BackendError::Transport(_)) | SessionError::Backend(BackendError::NotConfigured) => {
            "Could not reach the server. Please try again.".to_string()
        }
        SessionError::Backend(BackendError::Unauthorized(_)) => "Invalid email or password.".to_string(),
        other => other.to_string(),
    }
}

// ============================================================================
// Login
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub from: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub from: Option<String>,
}

fn render_login(state: &AppState, page: &Page, status: StatusCode, email: &str, from: Option<&str>, error: Option<&str>) -> Response {
    let mut context = TeraContext::new();
    context.insert("email", email);
    context.insert("from_path", &from);
    context.insert("error", &error);
    state.render_status(status, page, "login.html", &context)
}

/// GET /login
pub async fn login_page(State(state): State<AppState>, Query(query): Query<LoginQuery>, page: Page) -> Response {
    if page.session.is_some() {
        return Redirect::to(&post_login_target(query.from.as_deref())).into_response();
    }
    render_login(&state, &page, StatusCode::OK, "", query.from.as_deref(), None)
}

/// POST /login
pub async fn login(State(state): State<AppState>, page: Page, Form(form): Form<LoginForm>) -> Response {
    match state.sessions.sign_in(&form.email, &form.password).await {
        Ok(session) => {
            tracing::info!("Signed in: {}", session.account.id);
            let target = post_login_target(form.from.as_deref());
            let welcome = Flash::success(format!("Welcome back, {}!", session.account.display_name()));
            state.redirect_signed_in(&target, &session, Some(welcome))
        }
        Err(e) => {
            tracing::warn!("Sign-in failed for {}: {}", form.email.trim(), e);
            render_login(
                &state,
                &page,
                StatusCode::UNPROCESSABLE_ENTITY,
                &form.email,
                form.from.as_deref(),
                Some(&error_message(&e)),
            )
        }
    }
}

// ============================================================================
// Sign-up
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: String,
}

fn render_signup(state: &AppState, page: &Page, status: StatusCode, form: Option<&SignUpForm>, error: Option<&str>) -> Response {
    let mut context = TeraContext::new();
    context.insert("name", &form.map(|f| f.name.as_str()).unwrap_or(""));
    context.insert("email", &form.map(|f| f.email.as_str()).unwrap_or(""));
    context.insert("role", &form.map(|f| f.role.as_str()).unwrap_or("user"));
    context.insert("checks", &PasswordChecks::of(form.map(|f| f.password.as_str()).unwrap_or("")));
    context.insert("error", &error);
    state.render_status(status, page, "signup.html", &context)
}

/// GET /signup
pub async fn signup_page(State(state): State<AppState>, page: Page) -> Response {
    if page.session.is_some() {
        return Redirect::to("/").into_response();
    }
    render_signup(&state, &page, StatusCode::OK, None, None)
}

/// POST /signup
pub async fn signup(State(state): State<AppState>, page: Page, Form(form): Form<SignUpForm>) -> Response {
    let role: Role = form.role.parse().unwrap_or_default();

    match state.sessions.sign_up(&form.name, &form.email, &form.password, role).await {
        Ok(outcome) => match outcome.session {
            Some(session) => {
                state.redirect_signed_in("/", &session, Some(Flash::success("Your account has been created.")))
            }
            None => redirect_with_flash(
                "/login",
                Flash::success("Account created. Check your email to confirm it, then log in."),
            ),
        },
        Err(e) => {
            tracing::warn!("Sign-up failed for {}: {}", form.email.trim(), e);
            render_signup(
                &state,
                &page,
                StatusCode::UNPROCESSABLE_ENTITY,
                Some(&form),
                Some(&error_message(&e)),
            )
        }
    }
}

// ============================================================================
// Logout
// ============================================================================

/// POST /logout - Remote sign-out is best effort; the cookie always goes
pub async fn logout(State(state): State<AppState>, page: Page) -> Response {
    if let Some(session) = &page.session {
        state.sessions.sign_out(session).await;
    }
    let mut response = Redirect::to("/").into_response();
    append_cookie(&mut response, &state.cookies.clear());
    response
}

// ============================================================================
// Password reset
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ResetForm {
    pub email: String,
}

/// GET /reset-password
pub async fn reset_page(State(state): State<AppState>, page: Page) -> Response {
    let mut context = TeraContext::new();
    context.insert("email", "");
    context.insert("sent", &false);
    context.insert("error", &None::<String>);
    state.render(&page, "reset_password.html", &context)
}

/// POST /reset-password
pub async fn request_reset(State(state): State<AppState>, page: Page, Form(form): Form<ResetForm>) -> Response {
    let mut context = TeraContext::new();
    context.insert("email", &form.email);

    match state.sessions.request_password_reset(&form.email).await {
        Ok(()) => {
            tracing::info!("Password reset requested");
            context.insert("sent", &true);
            context.insert("error", &None::<String>);
            state.render(&page, "reset_password.html", &context)
        }
        Err(e) => {
            tracing::warn!("Password reset request failed: {}", e);
            context.insert("sent", &false);
            context.insert("error", &Some(error_message(&e)));
            state.render_status(StatusCode::UNPROCESSABLE_ENTITY, &page, "reset_password.html", &context)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RecoveryQuery {
    pub token_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordForm {
    pub password: String,
    pub confirm: String,
}

fn render_update(state: &AppState, page: &Page, status: StatusCode, error: Option<&str>) -> Response {
    let mut context = TeraContext::new();
    context.insert("can_update", &page.session.is_some());
    context.insert("error", &error);
    state.render_status(status, page, "update_password.html", &context)
}

/// GET /update-password
///
/// A reset link arrives with `token_hash`; exchanging it signs the visitor
/// in and reloads the page without the token.
pub async fn update_password_page(
    State(state): State<AppState>,
    Query(query): Query<RecoveryQuery>,
    page: Page,
) -> Response {
    let Some(token_hash) = query.token_hash.filter(|t| !t.trim().is_empty()) else {
        return render_update(&state, &page, StatusCode::OK, None);
    };

    match state.sessions.verify_recovery(token_hash.trim()).await {
        Ok(session) => state.redirect_signed_in("/update-password", &session, None),
        Err(e) => {
            tracing::warn!("Recovery link rejected: {}", e);
            render_update(
                &state,
                &page,
                StatusCode::BAD_REQUEST,
                Some("This reset link is invalid or has expired. Please request a new one."),
            )
        }
    }
}

/// POST /update-password
pub async fn update_password(
    State(state): State<AppState>,
    page: Page,
    Form(form): Form<UpdatePasswordForm>,
) -> Response {
    let Some(session) = page.session.as_ref() else {
        return redirect_with_flash(
            "/reset-password",
            Flash::error("Your reset session has expired. Please request a new link."),
        );
    };

    match state
        .sessions
        .update_password(session, &form.password, &form.confirm, None)
        .await
    {
        Ok(updated) => state.redirect_signed_in("/", &updated, Some(Flash::success("Your password has been updated."))),
        Err(e) => {
            tracing::warn!("Password update failed for {}: {}", session.account.id, e);
            render_update(&state, &page, StatusCode::UNPROCESSABLE_ENTITY, Some(&error_message(&e)))
        }
    }
}
