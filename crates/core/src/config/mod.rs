//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (EPHONE_SW_*)
//! 2. TOML config file (if EPHONE_SW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Deployment version baked into the store identifiers.
pub const CACHE_VERSION: &str = "1.0.0";

/// Icon used for the pre-cached asset and for every notification.
pub const APP_ICON_URL: &str = "https://i.postimg.cc/28p9L8FY/sogou20250606-073214826037-png.png";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (EPHONE_SW_*, `__` separates nested keys)
/// 2. TOML config file (if EPHONE_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin of the hosting application; same-origin requests use the static store.
    ///
    /// Set via EPHONE_SW_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Prefix shared by every store identifier.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Deployment version tag. Changing it rotates both stores on activation.
    ///
    /// Set via EPHONE_SW_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Path to SQLite cache database.
    ///
    /// Set via EPHONE_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to read per network response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// URLs pre-cached into the static store on install, relative to `origin`.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Regex patterns of cross-origin URLs eligible for the dynamic store.
    #[serde(default = "default_dynamic_patterns")]
    pub dynamic_patterns: Vec<String>,

    /// Document served when a navigation fails offline, relative to `origin`.
    #[serde(default = "default_app_shell")]
    pub app_shell: String,

    /// Push notification presentation.
    #[serde(default)]
    pub notification: NotificationConfig,
}

/// Fixed presentation for push notifications.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationConfig {
    #[serde(default = "default_notification_title")]
    pub title: String,

    /// Body used when a push event carries no payload.
    #[serde(default = "default_notification_body")]
    pub default_body: String,

    /// Icon and badge image.
    #[serde(default = "default_icon")]
    pub icon: String,

    /// Vibration pattern in milliseconds.
    #[serde(default = "default_vibrate")]
    pub vibrate: Vec<u32>,

    #[serde(default = "default_explore_title")]
    pub explore_title: String,

    #[serde(default = "default_close_title")]
    pub close_title: String,
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_cache_prefix() -> String {
    "ephone".into()
}

fn default_cache_version() -> String {
    CACHE_VERSION.into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./ephone-sw-cache.sqlite")
}

fn default_user_agent() -> String {
    "ephone-sw/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_static_assets() -> Vec<String> {
    vec!["./".into(), "./index.html".into(), "./manifest.json".into(), APP_ICON_URL.into()]
}

fn default_dynamic_patterns() -> Vec<String> {
    vec![
        r"^https://i\.postimg\.cc/".into(),
        r"^https://files\.catbox\.moe/".into(),
        r"^https://fonts\.googleapis\.com/".into(),
        r"^https://fonts\.gstatic\.com/".into(),
    ]
}

fn default_app_shell() -> String {
    "./index.html".into()
}

fn default_notification_title() -> String {
    "EPhone".into()
}

fn default_notification_body() -> String {
    "You have new messages".into()
}

fn default_icon() -> String {
    APP_ICON_URL.into()
}

fn default_vibrate() -> Vec<u32> {
    vec![100, 50, 100]
}

fn default_explore_title() -> String {
    "View".into()
}

fn default_close_title() -> String {
    "Close".into()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: default_notification_title(),
            default_body: default_notification_body(),
            icon: default_icon(),
            vibrate: default_vibrate(),
            explore_title: default_explore_title(),
            close_title: default_close_title(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            static_assets: default_static_assets(),
            dynamic_patterns: default_dynamic_patterns(),
            app_shell: default_app_shell(),
            notification: NotificationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme: {other}") }),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `EPHONE_SW_`
    /// 2. TOML file from `EPHONE_SW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("EPHONE_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("EPHONE_SW_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::extract(figment)
    }

    /// Extract and validate from an already-assembled figment.
    pub fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
