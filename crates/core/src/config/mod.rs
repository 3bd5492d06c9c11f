//! Engine configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWKIT_*)
//! 2. TOML config file (if SWKIT_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Install-time pre-cache failure policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecachePolicy {
    /// One failed manifest asset fails the whole install; nothing persists.
    /// Matches the source platform's batch primitive.
    #[default]
    AllOrNothing,
    /// Failed assets are logged and skipped; the install keeps the rest.
    BestEffort,
}

/// Defaults for notifications built from push payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Title used when the push payload carries none.
    #[serde(default = "default_notification_title")]
    pub title: String,

    /// Body used when the push payload carries none.
    #[serde(default = "default_notification_body")]
    pub body: String,

    /// Icon path, same-origin.
    #[serde(default = "default_notification_icon")]
    pub icon: String,

    /// Badge path, same-origin.
    #[serde(default = "default_notification_badge")]
    pub badge: String,

    /// Tag collapsing repeated notifications into one.
    #[serde(default = "default_notification_tag")]
    pub tag: String,
}

fn default_notification_title() -> String {
    "Reminder".into()
}

fn default_notification_body() -> String {
    "You have new content waiting.".into()
}

fn default_notification_icon() -> String {
    "/icons/icon-192x192.png".into()
}

fn default_notification_badge() -> String {
    "/icons/icon-72x72.png".into()
}

fn default_notification_tag() -> String {
    "app-reminder".into()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: default_notification_title(),
            body: default_notification_body(),
            icon: default_notification_icon(),
            badge: default_notification_badge(),
            tag: default_notification_tag(),
        }
    }
}

/// Engine configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWKIT_*)
/// 2. TOML config file (if SWKIT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Store namespace prefix; combined with `cache_version` it names the
    /// current generation.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Deployment version string. Changing it on deploy is what triggers
    /// the install/activate upgrade path.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Path to the SQLite store.
    ///
    /// Set via SWKIT_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin against which manifest paths and fallbacks resolve.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Document opened when a notification is activated.
    #[serde(default = "default_start_url")]
    pub start_url: String,

    /// Pre-cached fallback page served when a navigation fails offline.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Same-origin paths cached at install, in order.
    #[serde(default = "default_precache_manifest")]
    pub precache_manifest: Vec<String>,

    /// What a failed manifest asset does to the install.
    #[serde(default)]
    pub precache_policy: PrecachePolicy,

    /// URL prefixes always served network-first (frequently-changing
    /// third-party auth/identity services).
    #[serde(default = "default_dynamic_prefixes")]
    pub dynamic_prefixes: Vec<String>,

    /// Path segment marking application API requests.
    #[serde(default = "default_api_marker")]
    pub api_marker: String,

    /// Background-sync tags the engine recognizes.
    #[serde(default = "default_sync_tags")]
    pub sync_tags: Vec<String>,

    /// User-Agent string for outgoing requests.
    ///
    /// Set via SWKIT_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Notification defaults for push payloads.
    #[serde(default)]
    pub notification: NotificationConfig,
}

fn default_cache_prefix() -> String {
    "app-shell".into()
}

fn default_cache_version() -> String {
    "v0.1.0".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swkit-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_start_url() -> String {
    "/index.html".into()
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_precache_manifest() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/manifest.json",
        "/offline.html",
        "/favicon.svg",
        "/favicon.ico",
        "/icons/icon-192x192.png",
        "/icons/icon-512x512.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_dynamic_prefixes() -> Vec<String> {
    [
        "https://www.gstatic.com/firebasejs/",
        "https://apis.google.com/",
        "https://identitytoolkit.googleapis.com/",
        "https://firebaseinstallations.googleapis.com/",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_api_marker() -> String {
    "/api/".into()
}

fn default_sync_tags() -> Vec<String> {
    vec!["sync-data".into()]
}

fn default_user_agent() -> String {
    "swkit/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            db_path: default_db_path(),
            origin: default_origin(),
            start_url: default_start_url(),
            offline_page: default_offline_page(),
            precache_manifest: default_precache_manifest(),
            precache_policy: PrecachePolicy::default(),
            dynamic_prefixes: default_dynamic_prefixes(),
            api_marker: default_api_marker(),
            sync_tags: default_sync_tags(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            notification: NotificationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Identifier of the current store generation.
    ///
    /// At most one generation is current at a time; everything else is
    /// garbage the next activation collects.
    pub fn generation_id(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.cache_version)
    }

    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWKIT_`
    /// 2. TOML file from `SWKIT_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be read or parsed, or if
    /// validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWKIT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWKIT_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./swkit-cache.sqlite"));
        assert_eq!(config.user_agent, "swkit/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.precache_policy, PrecachePolicy::AllOrNothing);
        assert!(config.precache_manifest.contains(&"/offline.html".to_string()));
        assert!(!config.dynamic_prefixes.is_empty());
    }

    #[test]
    fn test_generation_id_combines_prefix_and_version() {
        let config = AppConfig {
            cache_prefix: "flashcards-pwa".into(),
            cache_version: "v3.5.1".into(),
            ..Default::default()
        };
        assert_eq!(config.generation_id(), "flashcards-pwa-v3.5.1");
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_precache_policy_wire_names() {
        let policy: PrecachePolicy = serde_json::from_str("\"best_effort\"").unwrap();
        assert_eq!(policy, PrecachePolicy::BestEffort);
        let policy: PrecachePolicy = serde_json::from_str("\"all_or_nothing\"").unwrap();
        assert_eq!(policy, PrecachePolicy::AllOrNothing);
    }
}
