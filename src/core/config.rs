//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.pagerouter/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::cache::{CacheOptions, DEFAULT_PROBE_KEY, DEFAULT_STORAGE_KEY};
use crate::core::document::DEFAULT_PAGE_SELECTOR;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PagerouterConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CacheConfig {
    pub enable_storage: Option<bool>,
    pub storage_key: Option<String>,
    pub probe_key: Option<String>,
    pub storage_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RoutingConfig {
    pub root_url_id: Option<String>,
    pub offcanvas_classes: Option<Vec<String>>,
    pub routing_class: Option<String>,
    pub simple_routes: Option<Vec<String>>,
    pub page_selector: Option<String>,
    pub scroll_duration_ms: Option<u64>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_ROOT_URL_ID: &str = "garberco";
pub const DEFAULT_ROUTING_CLASS: &str = "is-routing";
pub const DEFAULT_SCROLL_DURATION_MS: u64 = 400;
pub const DEFAULT_SIMPLE_ROUTES: &[&str] = &["/", "/about/", "/index/"];
pub const DEFAULT_OFFCANVAS_CLASSES: &[&str] =
    &["is-offcanvas", "is-offcanvas--about", "is-offcanvas--index"];

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

/// Settings the navigation controller reads.
#[derive(Debug, Clone, PartialEq)]
pub struct RouterSettings {
    pub root_url_id: String,
    pub offcanvas_classes: Vec<String>,
    pub routing_class: String,
    pub simple_routes: Vec<String>,
    pub page_selector: String,
    pub scroll_duration: Duration,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            root_url_id: DEFAULT_ROOT_URL_ID.to_string(),
            offcanvas_classes: to_strings(DEFAULT_OFFCANVAS_CLASSES),
            routing_class: DEFAULT_ROUTING_CLASS.to_string(),
            simple_routes: to_strings(DEFAULT_SIMPLE_ROUTES),
            page_selector: DEFAULT_PAGE_SELECTOR.to_string(),
            scroll_duration: Duration::from_millis(DEFAULT_SCROLL_DURATION_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_url: String,
    pub cache: CacheOptions,
    pub storage_dir: Option<PathBuf>,
    pub router: RouterSettings,
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.pagerouter/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".pagerouter").join("config.toml"))
}

/// Load config from `~/.pagerouter/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `PagerouterConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<PagerouterConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(PagerouterConfig::default());
        }
    };

    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(&path);
        return Ok(PagerouterConfig::default());
    }

    let contents = fs::read_to_string(&path).map_err(ConfigError::Io)?;
    let config: PagerouterConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &PathBuf) {
    let default_content = r#"# pagerouter configuration
# All settings are optional - defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# base_url = "http://localhost:8080"   # Or set PAGEROUTER_BASE_URL

# [cache]
# enable_storage = true                # Or set PAGEROUTER_ENABLE_STORAGE
# storage_key = "garberco-cache"
# probe_key = "garberco-test"
# storage_dir = "/tmp/pagerouter"      # Default: ~/.pagerouter/storage

# [routing]
# root_url_id = "garberco"
# offcanvas_classes = ["is-offcanvas", "is-offcanvas--about", "is-offcanvas--index"]
# routing_class = "is-routing"
# simple_routes = ["/", "/about/", "/index/"]
# page_selector = ".js-page"
# scroll_duration_ms = 400
"#;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to create config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Parses the usual spellings of a boolean env var.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
///
/// `cli_base_url` comes from the `--base-url` flag (None = not specified).
pub fn resolve(config: &PagerouterConfig, cli_base_url: Option<&str>) -> ResolvedConfig {
    // Base URL: CLI → env → config → default
    let base_url = cli_base_url
        .map(|s| s.to_string())
        .or_else(|| std::env::var("PAGEROUTER_BASE_URL").ok())
        .or_else(|| config.general.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    // Storage toggle: env → config → default
    let enable_storage = std::env::var("PAGEROUTER_ENABLE_STORAGE")
        .ok()
        .and_then(|raw| {
            let parsed = parse_bool(&raw);
            if parsed.is_none() {
                warn!("Ignoring unrecognized PAGEROUTER_ENABLE_STORAGE={:?}", raw);
            }
            parsed
        })
        .or(config.cache.enable_storage)
        .unwrap_or(true);

    let cache = CacheOptions {
        enable_storage,
        storage_key: config
            .cache
            .storage_key
            .clone()
            .unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string()),
        probe_key: config
            .cache
            .probe_key
            .clone()
            .unwrap_or_else(|| DEFAULT_PROBE_KEY.to_string()),
    };

    let defaults = RouterSettings::default();
    let routing = &config.routing;
    let router = RouterSettings {
        root_url_id: routing.root_url_id.clone().unwrap_or(defaults.root_url_id),
        offcanvas_classes: routing
            .offcanvas_classes
            .clone()
            .unwrap_or(defaults.offcanvas_classes),
        routing_class: routing.routing_class.clone().unwrap_or(defaults.routing_class),
        simple_routes: routing.simple_routes.clone().unwrap_or(defaults.simple_routes),
        page_selector: routing.page_selector.clone().unwrap_or(defaults.page_selector),
        scroll_duration: routing
            .scroll_duration_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.scroll_duration),
    };

    ResolvedConfig {
        base_url,
        cache,
        storage_dir: config.cache.storage_dir.as_ref().map(PathBuf::from),
        router,
    }
}
