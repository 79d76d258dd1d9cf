//! Light/dark display preference
//!
//! Persisted in a cookie. Without one, the browser's
//! `Sec-CH-Prefers-Color-Scheme` client hint decides; otherwise light.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cookie holding the chosen theme
pub const THEME_COOKIE: &str = "exhibitly_theme";

/// Client hint header carrying the OS color-scheme preference
pub const COLOR_SCHEME_HINT: &str = "sec-ch-prefers-color-scheme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Initial theme: persisted value, then the system hint, then light
    pub fn initial(persisted: Option<&str>, system_hint: Option<&str>) -> Self {
        if let Some(theme) = persisted.and_then(|v| v.parse().ok()) {
            return theme;
        }
        match system_hint.map(|h| h.trim().trim_matches('"').to_ascii_lowercase()) {
            Some(hint) if hint == "dark" => Theme::Dark,
            _ => Theme::Light,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(anyhow::anyhow!("Invalid theme: {}", s)),
        }
    }
}
