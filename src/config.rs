//! Application configuration.
//!
//! Loads settings from config.json at startup: which vision model reads the
//! screenshots, where the ledger lives, and how the overlay is rendered.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::paths;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<AppConfig> = OnceLock::new();

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisionProvider {
    Gemini,
    Openai,
}

impl VisionProvider {
    /// Environment variable consulted when `api_key` is left empty.
    pub fn api_key_env(self) -> &'static str {
        match self {
            VisionProvider::Gemini => "GEMINI_API_KEY",
            VisionProvider::Openai => "OPENAI_API_KEY",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            VisionProvider::Gemini => "gemini-2.0-flash",
            VisionProvider::Openai => "gpt-4o-mini",
        }
    }
}

impl fmt::Display for VisionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisionProvider::Gemini => write!(f, "gemini"),
            VisionProvider::Openai => write!(f, "openai"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub provider: VisionProvider,
    pub api_key: String,
    /// Model name; empty picks the provider's default.
    pub model: String,
    /// API root; empty uses the provider's public endpoint.
    pub base_url: String,
    /// Longer image side is scaled down to this many pixels (0 = never)
    pub max_image_side: u32,
    pub timeout_secs: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            provider: VisionProvider::Gemini,
            api_key: String::new(),
            model: VisionProvider::Gemini.default_model().to_string(),
            base_url: String::new(),
            max_image_side: 1600,
            timeout_secs: 60,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// JSON file on disk
    File,
    /// Overlay server exposing `/api/scores`
    Http,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Ledger file for `kind: file`; defaults to the data directory.
    pub path: Option<PathBuf>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::File,
            path: None,
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 5,
        }
    }
}

impl StoreConfig {
    pub fn ledger_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(paths::default_ledger_path)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Text file read by the streaming software; defaults to the data directory.
    pub path: Option<PathBuf>,
    pub poll_interval_ms: u64,
    /// Append `(+N)` after teams that scored in the last batch
    pub show_added: bool,
    pub current_marker: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            path: None,
            poll_interval_ms: 1000,
            show_added: true,
            current_marker: "<<".to_string(),
        }
    }
}

impl OverlayConfig {
    pub fn overlay_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(paths::default_overlay_path)
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub vision: VisionConfig,
    pub store: StoreConfig,
    pub overlay: OverlayConfig,
    /// Group players into teams by name prefix instead of reading team tags
    pub infer_teams: bool,
    pub history_path: Option<PathBuf>,
    /// One of error, warn, info, debug, trace
    pub log_level: Option<String>,
}

impl AppConfig {
    pub fn history_path(&self) -> PathBuf {
        self.history_path
            .clone()
            .unwrap_or_else(paths::default_history_path)
    }

    /// Fills gaps that depend on other fields or the environment.
    fn apply_env_overrides(&mut self) {
        if self.vision.api_key.trim().is_empty() {
            if let Ok(key) = std::env::var(self.vision.provider.api_key_env()) {
                self.vision.api_key = key;
            }
        }
        if self.vision.model.trim().is_empty() {
            self.vision.model = self.vision.provider.default_model().to_string();
        }
    }
}

/// Returns `<exe_dir>/config.json`.
pub fn default_config_path() -> PathBuf {
    paths::get_exe_dir().join("config.json")
}

/// Loads configuration from `path`, or returns defaults if it is missing or invalid.
pub fn load_config(path: &Path) -> AppConfig {
    info!("Looking for config at: {}", path.display());

    let mut config = if path.exists() {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    info!("Config loaded from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    AppConfig::default()
                }
            },
            Err(e) => {
                warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                AppConfig::default()
            }
        }
    } else {
        info!("{} not found. Using default config.", path.display());
        AppConfig::default()
    };

    config.apply_env_overrides();
    config
}

/// Initializes the global configuration. Later calls keep the first value.
pub fn init_config(path: Option<&Path>) -> &'static AppConfig {
    CONFIG.get_or_init(|| match path {
        Some(path) => load_config(path),
        None => load_config(&default_config_path()),
    })
}
