//! Tests for the theme engine

use super::*;
use crate::models::{RecordId, Role};
use tera::Context as TeraContext;

fn account(name: Option<&str>, role: Role) -> Account {
    Account {
        id: RecordId::from("acc-1"),
        email: "rani@example.com".to_string(),
        name: name.map(str::to_string),
        avatar_url: None,
        role,
    }
}

fn engine() -> ThemeEngine {
    ThemeEngine::new().unwrap()
}

#[test]
fn test_embedded_templates_load() {
    let engine = engine();
    for name in [
        "layout.html",
        "macros.html",
        "home.html",
        "gallery.html",
        "artwork.html",
        "dashboard.html",
        "upload.html",
        "profile.html",
        "login.html",
        "signup.html",
        "reset_password.html",
        "update_password.html",
        "loading.html",
        "not_found.html",
        "error.html",
    ] {
        assert!(engine.has_template(name), "missing template {}", name);
    }
}

#[test]
fn test_render_unknown_template() {
    let result = engine().render("missing.html", &TeraContext::new());
    assert!(matches!(result, Err(ThemeError::NotFound(name)) if name == "missing.html"));
}

#[test]
fn test_page_carries_theme() {
    let vars = StandardTemplateVars::new("/missing", Theme::Dark);
    let html = engine().render_page("not_found.html", &TeraContext::new(), &vars).unwrap();

    assert!(html.contains(r#"data-theme="dark""#));
    assert!(html.contains("Switch to light mode"));
    assert!(html.contains("Exhibitly"));
}

#[test]
fn test_anonymous_header_offers_login() {
    let vars = StandardTemplateVars::new("/", Theme::Light);
    let html = engine().render_page("not_found.html", &TeraContext::new(), &vars).unwrap();

    assert!(html.contains(r#"href="/login""#));
    assert!(html.contains(r#"href="/signup""#));
    assert!(!html.contains("Log out"));
}

#[test]
fn test_header_shows_initial_placeholder() {
    let user = account(Some("rani"), Role::Artist);
    let vars = StandardTemplateVars::new("/", Theme::Light).with_account(Some(&user));
    let html = engine().render_page("not_found.html", &TeraContext::new(), &vars).unwrap();

    let expected = format!(r#"<span class="avatar avatar-{}">R</span>"#, user.avatar_palette_index());
    assert!(html.contains(&expected));
    assert!(html.contains("Log out"));
    assert!(html.contains(r#"href="/dashboard""#));
}

#[test]
fn test_header_hides_artist_links_from_users() {
    let user = account(Some("Budi"), Role::User);
    let vars = StandardTemplateVars::new("/", Theme::Light).with_account(Some(&user));
    let html = engine().render_page("not_found.html", &TeraContext::new(), &vars).unwrap();

    assert!(!html.contains(r#"href="/dashboard""#));
    assert!(!html.contains(r#"href="/upload""#));
}

#[test]
fn test_header_account_falls_back_to_email() {
    let header = HeaderAccount::from(&account(None, Role::User));
    assert_eq!(header.display_name, "rani@example.com");
    assert_eq!(header.initial, "R");
    assert!(!header.is_artist);
}

#[test]
fn test_flash_is_rendered_and_escaped() {
    let vars = StandardTemplateVars::new("/", Theme::Light).with_flash(Some(Flash::error("<b>nope</b>")));
    let html = engine().render_page("not_found.html", &TeraContext::new(), &vars).unwrap();

    assert!(html.contains("alert-error"));
    assert!(html.contains("&lt;b&gt;nope&lt;&#x2F;b&gt;"));
}

#[test]
fn test_loading_page_refreshes() {
    let vars = StandardTemplateVars::new("/dashboard", Theme::Light);
    let html = engine().render_page("loading.html", &TeraContext::new(), &vars).unwrap();
    assert!(html.contains(r#"http-equiv="refresh""#));
}

#[test]
fn test_fallback_to_error_template() {
    let engine = ThemeEngine::from_templates(vec![
        ("broken.html".to_string(), "{{ missing.field }}".to_string()),
        ("error.html".to_string(), "error {{ status }}: {{ error_message }}".to_string()),
    ])
    .unwrap();
    let vars = StandardTemplateVars::new("/", Theme::Light);

    let html = engine.render_with_fallback("broken.html", &TeraContext::new(), &vars);
    assert_eq!(html, "error 500: Something went wrong while rendering this page.");
}

#[test]
fn test_fallback_to_simple_page() {
    let engine =
        ThemeEngine::from_templates(vec![("broken.html".to_string(), "{{ missing.field }}".to_string())]).unwrap();
    let vars = StandardTemplateVars::new("/", Theme::Light);

    let html = engine.render_with_fallback("broken.html", &TeraContext::new(), &vars);
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("Something went wrong"));
    assert!(html.contains("Back to home"));
}

#[test]
fn test_invalid_template_source() {
    let result = ThemeEngine::from_templates(vec![("bad.html".to_string(), "{% if %}".to_string())]);
    assert!(matches!(result, Err(ThemeError::TemplateError(_))));
}

#[test]
fn test_escape_html() {
    assert_eq!(escape_html(r#"<a href="x">&</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
}
