//! Application configuration
//!
//! JSON file under the platform config dir. Every field has a default, so a
//! missing file or missing keys are fine; out-of-range values are clamped.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants::layout::{MAP_HEIGHT, MAP_WIDTH, MAX_MAP_DIMENSION, MIN_MAP_DIMENSION};
use crate::constants::share::DEFAULT_BASE;
use crate::constants::storage::{APP_DIR, CONFIG_FILENAME};
use crate::persistence::JsonFileStorage;
use crate::snapshot::Layout;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base of generated share links (path or full URL, without query/fragment)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Durable storage file; platform data dir when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,

    /// Map SVG; the built-in Shanghai order is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_path: Option<PathBuf>,

    /// Font for snapshot text; system fonts are tried when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,

    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    #[serde(default = "default_map_width")]
    pub map_width: u32,

    #[serde(default = "default_map_height")]
    pub map_height: u32,
}

fn default_base_url() -> String {
    DEFAULT_BASE.to_string()
}

fn default_export_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_map_width() -> u32 {
    MAP_WIDTH
}

fn default_map_height() -> u32 {
    MAP_HEIGHT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            storage_path: None,
            map_path: None,
            font_path: None,
            export_dir: default_export_dir(),
            map_width: default_map_width(),
            map_height: default_map_height(),
        }
    }
}

impl Config {
    pub fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        path.push(CONFIG_FILENAME);
        path
    }

    /// Load from the default location with env overrides applied
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = match fs::read_to_string(path) {
            Ok(contents) => {
                let config = serde_json::from_str::<Config>(&contents)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?;
                info!(path = %path.display(), "Loaded config");
                config
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No config file found, using defaults");
                Self::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read config file {}", path.display()));
            }
        };

        config.apply_env_overrides(|key| env::var(key).ok());
        config.validate_and_clamp();
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file to {}", path.display()))?;
        Ok(())
    }

    /// Environment overrides: SHANGHAIEX_MAP, SHANGHAIEX_FONT, SHANGHAIEX_STORAGE
    pub fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        let path_var = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(map) = path_var("SHANGHAIEX_MAP") {
            self.map_path = Some(PathBuf::from(map));
        }
        if let Some(font) = path_var("SHANGHAIEX_FONT") {
            self.font_path = Some(PathBuf::from(font));
        }
        if let Some(storage) = path_var("SHANGHAIEX_STORAGE") {
            self.storage_path = Some(PathBuf::from(storage));
        }
    }

    /// Clamp values to safe ranges
    pub fn validate_and_clamp(&mut self) {
        let clamp = |name: &str, value: u32| -> u32 {
            let clamped = value.clamp(MIN_MAP_DIMENSION, MAX_MAP_DIMENSION);
            if clamped != value {
                warn!(field = name, value, min = MIN_MAP_DIMENSION, max = MAX_MAP_DIMENSION, "Map dimension out of range, clamping");
            }
            clamped
        };
        self.map_width = clamp("map_width", self.map_width);
        self.map_height = clamp("map_height", self.map_height);

        if self.base_url.contains(['?', '#']) {
            warn!(base_url = %self.base_url, "base_url must not contain a query or fragment, stripping");
            let end = self.base_url.find(['?', '#']).unwrap_or(self.base_url.len());
            self.base_url.truncate(end);
        }
    }

    pub fn layout(&self) -> Layout {
        Layout::with_map_size(self.map_width, self.map_height)
    }

    pub fn storage(&self) -> JsonFileStorage {
        JsonFileStorage::new(self.storage_path.clone().unwrap_or_else(JsonFileStorage::default_path))
    }
}
