//! Application configuration for bundlescout.
//!
//! User config lives at `~/.bundlescout/bundlescout.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BundlescoutError, Result};
use crate::types::BundleId;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "bundlescout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".bundlescout";

// ---------------------------------------------------------------------------
// Config structs (matching bundlescout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Storefront endpoints and locale.
    #[serde(default)]
    pub storefront: StorefrontConfig,

    /// Proxy fallback routing.
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Resolution runtime settings.
    #[serde(default)]
    pub resolve: ResolveConfig,
}

/// `[storefront]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorefrontConfig {
    /// Storefront origin used to build page URLs.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Locale `l=` query parameter.
    #[serde(default = "default_language")]
    pub language: String,

    /// Region `cc=` query parameter.
    #[serde(default = "default_country")]
    pub country: String,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            language: default_language(),
            country: default_country(),
        }
    }
}

impl StorefrontConfig {
    /// List page for a subject: the storefront app page.
    pub fn subject_page_url(&self, subject_id: &str) -> String {
        format!(
            "{}/app/{}/?l={}&cc={}",
            self.base_url.trim_end_matches('/'),
            subject_id,
            self.language,
            self.country
        )
    }

    /// Detail page for one bundle.
    pub fn bundle_page_url(&self, bundle_id: &BundleId) -> String {
        format!(
            "{}/bundle/{}/?l={}&cc={}",
            self.base_url.trim_end_matches('/'),
            bundle_id,
            self.language,
            self.country
        )
    }
}

fn default_base_url() -> String {
    "https://store.steampowered.com".into()
}
fn default_language() -> String {
    "english".into()
}
fn default_country() -> String {
    "US".into()
}

/// `[proxy]` section.
///
/// The ordered fetch candidates for a URL are the URL itself, then (when
/// `enabled`) the primary prefix, then each fallback prefix, each with the
/// canonical URL appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Whether proxy fallback candidates are tried at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Optional prefix tried before the fixed fallbacks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,

    /// Fixed fallback prefixes, tried in order.
    #[serde(default = "default_fallback_proxies")]
    pub fallbacks: Vec<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            primary: None,
            fallbacks: default_fallback_proxies(),
        }
    }
}

impl ProxyConfig {
    /// The primary prefix with a trailing `/` ensured, if one is set.
    ///
    /// Only the override is normalized; the fallback list is used exactly
    /// as written since several defaults end in `url=`.
    pub fn primary_prefix(&self) -> Option<String> {
        let raw = self.primary.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        if raw.ends_with('/') {
            Some(raw.to_string())
        } else {
            Some(format!("{raw}/"))
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_fallback_proxies() -> Vec<String> {
    vec![
        "https://r.jina.ai/".into(),
        "https://api.allorigins.win/raw?url=".into(),
        "https://corsproxy.io/?url=".into(),
    ]
}

/// `[resolve]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveConfig {
    /// Maximum concurrent detail-page fetches. Zero means unlimited.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum redirects followed per request.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_concurrency() -> u32 {
    4
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_redirects() -> u32 {
    5
}

// ---------------------------------------------------------------------------
// Resolve options (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime resolution options, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Storefront endpoints and locale.
    pub storefront: StorefrontConfig,
    /// Proxy fallback routing.
    pub proxy: ProxyConfig,
    /// Maximum concurrent detail-page fetches. Zero means unlimited.
    pub concurrency: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum redirects followed per request.
    pub max_redirects: u32,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ResolveOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            storefront: config.storefront.clone(),
            proxy: config.proxy.clone(),
            concurrency: config.resolve.concurrency,
            timeout_secs: config.resolve.timeout_secs,
            max_redirects: config.resolve.max_redirects,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.bundlescout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BundlescoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.bundlescout/bundlescout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BundlescoutError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        BundlescoutError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BundlescoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BundlescoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BundlescoutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("store.steampowered.com"));
        assert!(toml_str.contains("r.jina.ai"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.resolve.concurrency, 4);
        assert_eq!(parsed.storefront.country, "US");
        assert!(parsed.proxy.enabled);
        assert_eq!(parsed.proxy.fallbacks.len(), 3);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[storefront]
country = "DE"

[proxy]
enabled = false
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.storefront.country, "DE");
        assert_eq!(config.storefront.language, "english");
        assert!(!config.proxy.enabled);
        assert_eq!(config.resolve.timeout_secs, 30);
    }

    #[test]
    fn page_urls_interpolate_locale() {
        let storefront = StorefrontConfig::default();
        assert_eq!(
            storefront.subject_page_url("620"),
            "https://store.steampowered.com/app/620/?l=english&cc=US"
        );
        assert_eq!(
            storefront.bundle_page_url(&BundleId::new("8216")),
            "https://store.steampowered.com/bundle/8216/?l=english&cc=US"
        );
    }

    #[test]
    fn page_urls_tolerate_trailing_slash_base() {
        let storefront = StorefrontConfig {
            base_url: "http://127.0.0.1:9000/".into(),
            ..StorefrontConfig::default()
        };
        assert_eq!(
            storefront.subject_page_url("620"),
            "http://127.0.0.1:9000/app/620/?l=english&cc=US"
        );
    }

    #[test]
    fn primary_prefix_gains_trailing_slash() {
        let proxy = ProxyConfig {
            primary: Some("https://myproxy.example".into()),
            ..ProxyConfig::default()
        };
        assert_eq!(
            proxy.primary_prefix().as_deref(),
            Some("https://myproxy.example/")
        );

        let already = ProxyConfig {
            primary: Some("https://myproxy.example/".into()),
            ..ProxyConfig::default()
        };
        assert_eq!(
            already.primary_prefix().as_deref(),
            Some("https://myproxy.example/")
        );
    }

    #[test]
    fn blank_primary_is_ignored() {
        let proxy = ProxyConfig {
            primary: Some("   ".into()),
            ..ProxyConfig::default()
        };
        assert_eq!(proxy.primary_prefix(), None);
    }

    #[test]
    fn resolve_options_from_app_config() {
        let app = AppConfig::default();
        let opts = ResolveOptions::from(&app);
        assert_eq!(opts.concurrency, 4);
        assert_eq!(opts.timeout_secs, 30);
        assert_eq!(opts.max_redirects, 5);
        assert!(opts.proxy.enabled);
    }
}
