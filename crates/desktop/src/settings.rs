use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use facetone_core::capture::infrastructure::ffmpeg_source::DEFAULT_CAMERA_DEVICE;
use facetone_core::shared::constants::DEFAULT_TICK_INTERVAL;

const APP_DIR_NAME: &str = "Facetone";

pub const MIN_TICK_INTERVAL_MS: u32 = 33;
pub const MAX_TICK_INTERVAL_MS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    System,
    Dark,
    Light,
}

impl Appearance {
    pub const ALL: &[Appearance] = &[Appearance::System, Appearance::Dark, Appearance::Light];
}

impl std::fmt::Display for Appearance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Appearance::System => write!(f, "System"),
            Appearance::Dark => write!(f, "Dark"),
            Appearance::Light => write!(f, "Light"),
        }
    }
}

/// User preferences, persisted as JSON in the platform config directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Face detection confidence threshold in percent.
    pub confidence: u32,
    /// Milliseconds between analyzed camera frames.
    pub tick_interval_ms: u32,
    pub camera_device: String,
    pub appearance: Appearance,
    pub high_contrast: bool,
    pub font_scale: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            confidence: 25,
            tick_interval_ms: DEFAULT_TICK_INTERVAL.as_millis() as u32,
            camera_device: DEFAULT_CAMERA_DEVICE.to_string(),
            appearance: Appearance::System,
            high_contrast: false,
            font_scale: 1.0,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn save(&self) {
        if let Some(path) = Self::config_path() {
            self.save_to(&path);
        }
    }

    /// Missing or unreadable files fall back to defaults.
    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str::<Settings>(&json).ok())
            .map(Settings::sanitized)
            .unwrap_or_default()
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    log::warn!("Failed to save settings to {}: {e}", path.display());
                }
            }
            Err(e) => log::warn!("Failed to serialize settings: {e}"),
        }
    }

    pub fn confidence_fraction(&self) -> f64 {
        self.confidence.min(100) as f64 / 100.0
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms as u64)
    }

    fn sanitized(mut self) -> Self {
        self.confidence = self.confidence.min(100);
        self.tick_interval_ms = self
            .tick_interval_ms
            .clamp(MIN_TICK_INTERVAL_MS, MAX_TICK_INTERVAL_MS);
        if !(0.8..=1.5).contains(&self.font_scale) {
            self.font_scale = 1.0;
        }
        if self.camera_device.trim().is_empty() {
            self.camera_device = DEFAULT_CAMERA_DEVICE.to_string();
        }
        self
    }
}
