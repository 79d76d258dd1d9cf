//! Page rendering
//!
//! Tera templates embedded at compile time, the standard variables every
//! page receives (site name, request path, header account, theme, flash) and
//! the light/dark preference.

use chrono::Datelike;
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use tera::{Context as TeraContext, Tera};

use crate::models::Account;

mod error;
pub mod preference;

#[cfg(test)]
mod tests;

pub use error::ThemeError;
pub use preference::{Theme, COLOR_SCHEME_HINT, THEME_COOKIE};

/// Name shown in the header and page titles
pub const SITE_NAME: &str = "Exhibitly";

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

/// Template engine for rendering pages
pub struct ThemeEngine {
    tera: Tera,
}

/// Signed-in account as the header shows it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderAccount {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub initial: String,
    pub palette_index: usize,
    pub avatar_url: Option<String>,
    pub is_artist: bool,
}

impl From<&Account> for HeaderAccount {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.to_string(),
            email: account.email.clone(),
            display_name: account.display_name().to_string(),
            initial: account.initial(),
            palette_index: account.avatar_palette_index(),
            avatar_url: account.avatar().map(str::to_string),
            is_artist: account.is_artist(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// One-shot alert shown at the top of the next rendered page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }
}

/// Variables injected into every page
#[derive(Debug, Clone, Serialize)]
pub struct StandardTemplateVars {
    pub site_name: String,
    pub request_path: String,
    pub year: i32,
    pub theme: Theme,
    pub current_user: Option<HeaderAccount>,
    pub flash: Option<Flash>,
}

impl StandardTemplateVars {
    pub fn new(request_path: impl Into<String>, theme: Theme) -> Self {
        Self {
            site_name: SITE_NAME.to_string(),
            request_path: request_path.into(),
            year: chrono::Utc::now().year(),
            theme,
            current_user: None,
            flash: None,
        }
    }

    pub fn with_account(mut self, account: Option<&Account>) -> Self {
        self.current_user = account.map(HeaderAccount::from);
        self
    }

    pub fn with_flash(mut self, flash: Option<Flash>) -> Self {
        self.flash = flash;
        self
    }
}

impl ThemeEngine {
    /// Load the templates compiled into the binary
    pub fn new() -> Result<Self, ThemeError> {
        let mut templates = Vec::new();
        for name in EmbeddedTemplates::iter() {
            let file = EmbeddedTemplates::get(&name).ok_or_else(|| ThemeError::NotFound(name.to_string()))?;
            let content = std::str::from_utf8(&file.data)
                .map_err(|_| ThemeError::InvalidEncoding(name.to_string()))?
                .to_string();
            templates.push((name.to_string(), content));
        }
        Self::from_templates(templates)
    }

    /// Build an engine from in-memory `(name, source)` pairs
    pub fn from_templates(templates: Vec<(String, String)>) -> Result<Self, ThemeError> {
        let mut tera = Tera::default();
        // Adding all at once lets Tera resolve `extends` regardless of order
        tera.add_raw_templates(templates)
            .map_err(|e| ThemeError::TemplateError(describe(&e)))?;
        tracing::debug!("Loaded {} templates", tera.get_template_names().count());
        Ok(Self { tera })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|t| t == name)
    }

    /// Render a template
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, ThemeError> {
        if !self.has_template(template) {
            return Err(ThemeError::NotFound(template.to_string()));
        }
        self.tera.render(template, context).map_err(|e| {
            ThemeError::TemplateError(format!("Failed to render '{}': {}", template, describe(&e)))
        })
    }

    /// Render a template with the standard page variables added
    pub fn render_page(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
    ) -> Result<String, ThemeError> {
        let mut full_context = context.clone();
        full_context.insert("site_name", &standard_vars.site_name);
        full_context.insert("request_path", &standard_vars.request_path);
        full_context.insert("year", &standard_vars.year);
        full_context.insert("theme", &standard_vars.theme);
        full_context.insert("next_theme", &standard_vars.theme.toggled());
        full_context.insert("current_user", &standard_vars.current_user);
        full_context.insert("flash", &standard_vars.flash);

        self.render(template, &full_context)
    }

    /// Render a page, falling back to `error.html` and then to bare HTML
    ///
    /// Always produces a document.
    pub fn render_with_fallback(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
    ) -> String {
        match self.render_page(template, context, standard_vars) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("Failed to render template '{}': {}", template, e);

                let mut error_context = TeraContext::new();
                error_context.insert("error_message", "Something went wrong while rendering this page.");
                error_context.insert("status", &500u16);

                match self.render_page("error.html", &error_context, standard_vars) {
                    Ok(html) => html,
                    Err(error_template_err) => {
                        tracing::error!("Failed to render error template: {}", error_template_err);
                        Self::simple_error_page(&e.to_string())
                    }
                }
            }
        }
    }

    /// Last-resort page when even `error.html` cannot render
    fn simple_error_page(error: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{site} - Error</title>
</head>
<body style="font-family: sans-serif; max-width: 600px; margin: 50px auto;">
    <h1>Something went wrong</h1>
    <p>{error}</p>
    <p><a href="/">Back to home</a></p>
</body>
</html>"#,
            site = SITE_NAME,
            error = escape_html(error)
        )
    }
}

/// Flatten an error and its sources into one line
fn describe(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
