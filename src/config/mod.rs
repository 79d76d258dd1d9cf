//! Configuration management
//!
//! This module handles loading and parsing configuration for Exhibitly.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Hosted backend (auth + data) configuration
    #[serde(default)]
    pub backend: BackendConfig,
    /// Media CDN configuration
    #[serde(default)]
    pub media: MediaConfig,
    /// Session cookie configuration
    #[serde(default)]
    pub session: SessionConfig,
    /// Gallery presentation
    #[serde(default)]
    pub gallery: GalleryConfig,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Externally visible origin, used to build links in emails
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

/// Hosted backend configuration (Supabase-compatible)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    #[serde(default)]
    pub url: String,
    /// Public anon key sent as `apikey`
    #[serde(default)]
    pub anon_key: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Where the password-reset email sends the user.
    /// Empty means `<public_url>/update-password`.
    #[serde(default)]
    pub password_reset_redirect: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            timeout_secs: default_timeout_secs(),
            password_reset_redirect: String::new(),
        }
    }
}

impl BackendConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.anon_key.trim().is_empty()
    }
}

fn default_timeout_secs() -> u64 {
    15
}

/// Media CDN configuration (Cloudinary-compatible unsigned uploads)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default)]
    pub cloud_name: String,
    #[serde(default)]
    pub upload_preset: String,
    /// Upload API base URL
    #[serde(default = "default_media_api_base")]
    pub api_base: String,
    /// Maximum file size in bytes (default: 50MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Upload request timeout in seconds
    #[serde(default = "default_media_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            cloud_name: String::new(),
            upload_preset: String::new(),
            api_base: default_media_api_base(),
            max_file_size: default_max_file_size(),
            timeout_secs: default_media_timeout_secs(),
        }
    }
}

impl MediaConfig {
    pub fn is_configured(&self) -> bool {
        !self.cloud_name.trim().is_empty() && !self.upload_preset.trim().is_empty()
    }
}

fn default_media_timeout_secs() -> u64 {
    120
}

fn default_media_api_base() -> String {
    "https://api.cloudinary.com/v1_1".to_string()
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024 // 50MB
}

/// Session cookie configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// HMAC key for signing session cookies. Random per process when empty.
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
    /// Add the `Secure` attribute to cookies
    #[serde(default)]
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            secret: String::new(),
            max_age_secs: default_max_age_secs(),
            secure: false,
        }
    }
}

fn default_cookie_name() -> String {
    "exhibitly_session".to_string()
}

fn default_max_age_secs() -> u64 {
    7 * 24 * 3600 // 7 days
}

/// Gallery presentation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Artworks shown on the landing page
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
    /// Notifications shown on the dashboard
    #[serde(default = "default_notification_limit")]
    pub notification_limit: usize,
    /// Categories offered on the upload form
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            recent_limit: default_recent_limit(),
            notification_limit: default_notification_limit(),
            categories: default_categories(),
        }
    }
}

fn default_page_size() -> usize {
    12
}

fn default_recent_limit() -> usize {
    4
}

fn default_notification_limit() -> usize {
    5
}

fn default_categories() -> Vec<String> {
    ["fairy", "kastil", "fiksi", "alam", "mitologi"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: format_yaml_error(&e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern `EXHIBITLY_<SECTION>_<KEY>`:
    /// - EXHIBITLY_SERVER_HOST, EXHIBITLY_SERVER_PORT, EXHIBITLY_SERVER_PUBLIC_URL
    /// - EXHIBITLY_BACKEND_URL, EXHIBITLY_BACKEND_ANON_KEY, EXHIBITLY_BACKEND_TIMEOUT_SECS
    /// - EXHIBITLY_MEDIA_CLOUD_NAME, EXHIBITLY_MEDIA_UPLOAD_PRESET, EXHIBITLY_MEDIA_MAX_FILE_SIZE,
    ///   EXHIBITLY_MEDIA_TIMEOUT_SECS
    /// - EXHIBITLY_SESSION_SECRET, EXHIBITLY_SESSION_SECURE
    /// - EXHIBITLY_GALLERY_PAGE_SIZE
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        // Server configuration
        if let Ok(host) = std::env::var("EXHIBITLY_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("EXHIBITLY_SERVER_PORT") {
            self.server.port = port;
        }
        if let Ok(public_url) = std::env::var("EXHIBITLY_SERVER_PUBLIC_URL") {
            self.server.public_url = public_url;
        }

        // Backend configuration
        if let Ok(url) = std::env::var("EXHIBITLY_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Ok(key) = std::env::var("EXHIBITLY_BACKEND_ANON_KEY") {
            self.backend.anon_key = key;
        }
        if let Some(timeout) = env_parse::<u64>("EXHIBITLY_BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = timeout;
        }
        if let Ok(redirect) = std::env::var("EXHIBITLY_BACKEND_PASSWORD_RESET_REDIRECT") {
            self.backend.password_reset_redirect = redirect;
        }

        // Media configuration
        if let Ok(cloud) = std::env::var("EXHIBITLY_MEDIA_CLOUD_NAME") {
            self.media.cloud_name = cloud;
        }
        if let Ok(preset) = std::env::var("EXHIBITLY_MEDIA_UPLOAD_PRESET") {
            self.media.upload_preset = preset;
        }
        if let Some(size) = env_parse::<u64>("EXHIBITLY_MEDIA_MAX_FILE_SIZE") {
            self.media.max_file_size = size;
        }
        if let Some(timeout) = env_parse::<u64>("EXHIBITLY_MEDIA_TIMEOUT_SECS") {
            self.media.timeout_secs = timeout;
        }

        // Session configuration
        if let Ok(secret) = std::env::var("EXHIBITLY_SESSION_SECRET") {
            self.session.secret = secret;
        }
        if let Some(secure) = env_parse::<bool>("EXHIBITLY_SESSION_SECURE") {
            self.session.secure = secure;
        }

        // Gallery configuration
        if let Some(page_size) = env_parse::<usize>("EXHIBITLY_GALLERY_PAGE_SIZE") {
            self.gallery.page_size = page_size;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.gallery.page_size == 0 {
            return Err(ConfigError::ValidationError(
                "gallery.page_size must be greater than zero".to_string(),
            ));
        }
        if self.gallery.categories.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "gallery.categories must not contain blank entries".to_string(),
            ));
        }
        Ok(())
    }

    /// Redirect target embedded in password-reset emails
    pub fn password_reset_redirect(&self) -> String {
        if self.backend.password_reset_redirect.trim().is_empty() {
            format!("{}/update-password", self.server.public_url.trim_end_matches('/'))
        } else {
            self.backend.password_reset_redirect.clone()
        }
    }
}

/// Read and parse an env var, ignoring invalid values
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "EXHIBITLY_SERVER_HOST",
    "EXHIBITLY_SERVER_PORT",
    "EXHIBITLY_SERVER_PUBLIC_URL",
    "EXHIBITLY_BACKEND_URL",
    "EXHIBITLY_BACKEND_ANON_KEY",
    "EXHIBITLY_BACKEND_TIMEOUT_SECS",
    "EXHIBITLY_BACKEND_PASSWORD_RESET_REDIRECT",
    "EXHIBITLY_MEDIA_CLOUD_NAME",
    "EXHIBITLY_MEDIA_UPLOAD_PRESET",
    "EXHIBITLY_MEDIA_MAX_FILE_SIZE",
    "EXHIBITLY_MEDIA_TIMEOUT_SECS",
    "EXHIBITLY_SESSION_SECRET",
    "EXHIBITLY_SESSION_SECURE",
    "EXHIBITLY_GALLERY_PAGE_SIZE",
];

#[cfg(test)]
fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::path::Path::new("nonexistent_config.yml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.backend.timeout_secs, 15);
        assert!(!config.backend.is_configured());
        assert!(!config.media.is_configured());
        assert_eq!(config.media.max_file_size, 50 * 1024 * 1024);
        assert_eq!(config.session.cookie_name, "exhibitly_session");
        assert_eq!(config.gallery.page_size, 12);
        assert_eq!(config.gallery.recent_limit, 4);
        assert_eq!(config.gallery.notification_limit, 5);
        assert_eq!(
            config.gallery.categories,
            vec!["fairy", "kastil", "fiksi", "alam", "mitologi"]
        );
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 3000\n").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.gallery.page_size, 12);
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 9000
  public_url: "https://exhibitly.example"
backend:
  url: "https://abc.supabase.co"
  anon_key: "anon"
  timeout_secs: 5
media:
  cloud_name: "demo"
  upload_preset: "unsigned"
  max_file_size: 1024
session:
  secret: "s3cret"
  secure: true
gallery:
  page_size: 6
  categories: ["alam", "fiksi"]
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert!(config.backend.is_configured());
        assert_eq!(config.backend.timeout_secs, 5);
        assert!(config.media.is_configured());
        assert_eq!(config.media.max_file_size, 1024);
        assert_eq!(config.session.secret, "s3cret");
        assert!(config.session.secure);
        assert_eq!(config.gallery.page_size, 6);
        assert_eq!(config.gallery.categories, vec!["alam", "fiksi"]);
        assert_eq!(
            config.password_reset_redirect(),
            "https://exhibitly.example/update-password"
        );
    }

    #[test]
    fn test_explicit_reset_redirect_wins() {
        let mut config = Config::default();
        config.backend.password_reset_redirect = "https://app.example/update-password".into();
        assert_eq!(config.password_reset_redirect(), "https://app.example/update-password");
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: not_a_number\n").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        let err_msg = err.to_string();
        assert!(err_msg.contains("parse"));
        assert!(err_msg.contains("line"));
    }

    #[test]
    fn test_load_malformed_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  host: [invalid yaml").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "gallery:\n  page_size: 0\n").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn test_env_override_server_and_backend() {
        let _guard = lock_env();
        clear_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  host: \"0.0.0.0\"\n  port: 8080\n").unwrap();

        std::env::set_var("EXHIBITLY_SERVER_HOST", "192.168.1.1");
        std::env::set_var("EXHIBITLY_SERVER_PORT", "4000");
        std::env::set_var("EXHIBITLY_BACKEND_URL", "https://env.supabase.co");
        std::env::set_var("EXHIBITLY_BACKEND_ANON_KEY", "env-key");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.backend.url, "https://env.supabase.co");
        assert_eq!(config.backend.anon_key, "env-key");

        clear_env();
    }

    #[test]
    fn test_env_override_media_and_session() {
        let _guard = lock_env();
        clear_env();

        let file = NamedTempFile::new().unwrap();

        std::env::set_var("EXHIBITLY_MEDIA_CLOUD_NAME", "cloud");
        std::env::set_var("EXHIBITLY_MEDIA_UPLOAD_PRESET", "preset");
        std::env::set_var("EXHIBITLY_MEDIA_MAX_FILE_SIZE", "2048");
        std::env::set_var("EXHIBITLY_MEDIA_TIMEOUT_SECS", "30");
        std::env::set_var("EXHIBITLY_SESSION_SECRET", "from-env");
        std::env::set_var("EXHIBITLY_SESSION_SECURE", "true");

        let config = Config::load_with_env(file.path()).unwrap();

        assert!(config.media.is_configured());
        assert_eq!(config.media.max_file_size, 2048);
        assert_eq!(config.media.timeout_secs, 30);
        assert_eq!(config.session.secret, "from-env");
        assert!(config.session.secure);

        clear_env();
    }

    #[test]
    fn test_env_override_invalid_numbers_ignored() {
        let _guard = lock_env();
        clear_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8080\n").unwrap();

        std::env::set_var("EXHIBITLY_SERVER_PORT", "not_a_number");
        std::env::set_var("EXHIBITLY_GALLERY_PAGE_SIZE", "-3");
        std::env::set_var("EXHIBITLY_SESSION_SECURE", "maybe");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.gallery.page_size, 12);
        assert!(!config.session.secure);

        clear_env();
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn server_config_strategy() -> impl Strategy<Value = ServerConfig> {
        (
            prop_oneof![
                Just("localhost".to_string()),
                Just("0.0.0.0".to_string()),
                "[a-z][a-z0-9]{0,10}",
            ],
            1u16..=65535,
            "https://[a-z]{3,10}\\.example",
        )
            .prop_map(|(host, port, public_url)| ServerConfig {
                host,
                port,
                public_url,
            })
    }

    fn gallery_config_strategy() -> impl Strategy<Value = GalleryConfig> {
        (
            1usize..100,
            1usize..20,
            1usize..20,
            prop::collection::vec("[a-z]{3,10}", 1..6),
        )
            .prop_map(|(page_size, recent_limit, notification_limit, categories)| GalleryConfig {
                page_size,
                recent_limit,
                notification_limit,
                categories,
            })
    }

    fn config_strategy() -> impl Strategy<Value = Config> {
        (
            server_config_strategy(),
            gallery_config_strategy(),
            "[a-z0-9]{0,16}",
            1u64..1_000_000_000,
        )
            .prop_map(|(server, gallery, secret, max_file_size)| Config {
                server,
                gallery,
                session: SessionConfig {
                    secret,
                    ..SessionConfig::default()
                },
                media: MediaConfig {
                    max_file_size,
                    ..MediaConfig::default()
                },
                backend: BackendConfig::default(),
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Serializing a config to YAML and loading it back yields the same config
        #[test]
        fn config_yaml_roundtrip(config in config_strategy()) {
            let yaml = serde_yaml::to_string(&config).unwrap();
            let mut file = NamedTempFile::new().unwrap();
            write!(file, "{}", yaml).unwrap();

            let loaded = Config::load(file.path()).unwrap();
            prop_assert_eq!(loaded, config);
        }

        /// A config naming only the port keeps every other default
        #[test]
        fn partial_config_fills_defaults(port in 1u16..=65535) {
            let mut file = NamedTempFile::new().unwrap();
            write!(file, "server:\n  port: {}\n", port).unwrap();

            let loaded = Config::load(file.path()).unwrap();
            prop_assert_eq!(loaded.server.port, port);
            prop_assert_eq!(loaded.gallery, GalleryConfig::default());
            prop_assert_eq!(loaded.session, SessionConfig::default());
        }

        /// Environment values take precedence over the file
        #[test]
        fn env_precedence_over_file(file_port in 1u16..=65535, env_port in 1u16..=65535) {
            let _guard = lock_env();
            clear_env();

            let mut file = NamedTempFile::new().unwrap();
            write!(file, "server:\n  port: {}\n", file_port).unwrap();
            std::env::set_var("EXHIBITLY_SERVER_PORT", env_port.to_string());

            let loaded = Config::load_with_env(file.path()).unwrap();
            clear_env();
            prop_assert_eq!(loaded.server.port, env_port);
        }
    }
}
