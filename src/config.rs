//! Service configuration.
//!
//! Loads settings from config.json at startup. Provides the OCR endpoint,
//! request timeout, detection threshold and composite rendering parameters.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Complete service configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Endpoint of the general OCR API (overridden by `OCR_API_URL`)
    #[serde(default)]
    pub ocr_api_url: String,
    /// Value of the `X-OCR-SECRET` header (overridden by `OCR_TOKEN`)
    #[serde(default)]
    pub ocr_secret: String,
    /// Timeout for a single OCR request (milliseconds)
    #[serde(default = "default_ocr_timeout_ms")]
    pub ocr_timeout_ms: u64,
    /// Language hint sent with every OCR request
    #[serde(default = "default_ocr_lang")]
    pub ocr_lang: String,
    /// Uploads with fewer distinct detected classes are rejected
    #[serde(default = "default_min_detected_classes")]
    pub min_detected_classes: usize,
    /// TrueType font used for the composite label headers
    #[serde(default)]
    pub font_path: Option<String>,
    /// Height of the label header drawn above every crop (pixels)
    #[serde(default = "default_label_height")]
    pub label_height: u32,
    /// Point size of the label header text
    #[serde(default = "default_label_font_size")]
    pub label_font_size: f32,
    /// Left inset of the label header text (pixels)
    #[serde(default = "default_label_margin")]
    pub label_margin: i32,
    /// Song catalog JSON, relative to the executable directory
    #[serde(default = "default_song_catalog")]
    pub song_catalog: String,
    /// Append-only score record file, relative to the executable directory
    #[serde(default = "default_records_file")]
    pub records_file: String,
    /// Song thumbnails as `<dir>/<sha256(title)>/<difficulty>.jpg`
    #[serde(default = "default_thumbnail_dir")]
    pub thumbnail_dir: String,
    /// Number of upload worker threads in batch mode
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

fn default_ocr_timeout_ms() -> u64 {
    30000
}

fn default_ocr_lang() -> String {
    "ja".to_string()
}

fn default_min_detected_classes() -> usize {
    3
}

fn default_label_height() -> u32 {
    40
}

fn default_label_font_size() -> f32 {
    20.0
}

fn default_label_margin() -> i32 {
    10
}

fn default_song_catalog() -> String {
    "resources/songs.json".to_string()
}

fn default_thumbnail_dir() -> String {
    "resources/thumbnails".to_string()
}

fn default_records_file() -> String {
    "records.jsonl".to_string()
}

fn default_worker_count() -> usize {
    2
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ocr_api_url: String::new(),
            ocr_secret: String::new(),
            ocr_timeout_ms: default_ocr_timeout_ms(),
            ocr_lang: default_ocr_lang(),
            min_detected_classes: default_min_detected_classes(),
            font_path: None,
            label_height: default_label_height(),
            label_font_size: default_label_font_size(),
            label_margin: default_label_margin(),
            song_catalog: default_song_catalog(),
            records_file: default_records_file(),
            thumbnail_dir: default_thumbnail_dir(),
            worker_count: default_worker_count(),
        }
    }
}

impl AppConfig {
    /// Applies `OCR_API_URL` / `OCR_TOKEN` from the environment, if set.
    fn apply_env(mut self) -> Self {
        if let Ok(url) = std::env::var("OCR_API_URL") {
            self.ocr_api_url = url;
        }
        if let Ok(token) = std::env::var("OCR_TOKEN") {
            self.ocr_secret = token;
        }
        self
    }
}

/// Parses a config file, returning defaults for anything that fails.
fn load_config_from(config_path: &Path) -> AppConfig {
    log::info!("Looking for config at: {}", config_path.display());

    if !config_path.exists() {
        log::info!("config.json not found. Using default config.");
        return AppConfig::default();
    }

    match fs::read_to_string(config_path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => {
                log::info!("Config loaded from config.json");
                config
            }
            Err(e) => {
                log::warn!("Failed to parse config.json: {}. Using defaults.", e);
                AppConfig::default()
            }
        },
        Err(e) => {
            log::warn!("Failed to read config.json: {}. Using defaults.", e);
            AppConfig::default()
        }
    }
}

/// Loads configuration from config.json next to the executable, or defaults.
fn load_config() -> AppConfig {
    let config_path = crate::paths::get_exe_dir().join("config.json");
    load_config_from(&config_path).apply_env()
}

/// Initializes the global configuration. Call once at startup.
pub fn init_config() {
    let _ = CONFIG.set(load_config());
}

/// Returns a reference to the global configuration.
/// Panics if called before init_config().
pub fn get_config() -> &'static AppConfig {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
}
