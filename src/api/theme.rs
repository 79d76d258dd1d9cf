//! Theme toggle endpoint

use axum::{
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};

use crate::api::guard::post_login_target;
use crate::api::middleware::{append_cookie, wants_json, Page};
use crate::api::session::cookie_header;
use crate::theme::{Theme, THEME_COOKIE};

/// One year
const THEME_COOKIE_MAX_AGE: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Default, Deserialize)]
pub struct ToggleForm {
    #[serde(default)]
    pub return_to: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ThemeResponse {
    pub theme: Theme,
}

/// POST /theme/toggle - Flip light/dark, persist it and go back
pub async fn toggle(headers: HeaderMap, page: Page, Form(form): Form<ToggleForm>) -> Response {
    let theme = page.theme.toggled();
    tracing::debug!("Theme switched to {}", theme);

    let mut response = if wants_json(&headers) {
        Json(ThemeResponse { theme }).into_response()
    } else {
        Redirect::to(&post_login_target(form.return_to.as_deref())).into_response()
    };
    append_cookie(
        &mut response,
        &cookie_header(THEME_COOKIE, theme.as_str(), Some(THEME_COOKIE_MAX_AGE), false),
    );
    response
}
