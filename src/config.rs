//! Persistent settings
//!
//! JSON file under the platform config directory, created with defaults on
//! first run. Values that are out of range are clamped on load.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants::{self, output, paths};

/// User-tunable settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Folder under the profile directory holding backup and output
    #[serde(default = "default_tool_folder")]
    pub tool_folder: String,

    /// Explicit wallpaper source, used instead of the theme directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallpaper_source: Option<PathBuf>,

    /// Font family (with optional style) resolved through fontconfig
    #[serde(default = "default_font_family")]
    pub font_family: String,

    /// Font file loaded before any lookup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,

    /// JPEG quality of the composited wallpaper (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Log level used when LOG_LEVEL is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_tool_folder() -> String {
    paths::DEFAULT_TOOL_FOLDER.to_string()
}

fn default_font_family() -> String {
    constants::fonts::DEFAULT_FAMILY.to_string()
}

fn default_jpeg_quality() -> u8 {
    output::DEFAULT_JPEG_QUALITY
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tool_folder: default_tool_folder(),
            wallpaper_source: None,
            font_family: default_font_family(),
            font_path: None,
            jpeg_quality: default_jpeg_quality(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(constants::config::APP_DIR);
        path.push(constants::config::FILENAME);
        path
    }

    /// `log_level` from the file at `path`, read before logging is set up.
    /// Missing or unreadable files yield `None`.
    pub fn peek_log_level(path: &Path) -> Option<String> {
        #[derive(Deserialize)]
        struct LogOnly {
            log_level: Option<String>,
        }

        let contents = fs::read_to_string(path).ok()?;
        serde_json::from_str::<LogOnly>(&contents).ok()?.log_level
    }

    /// Load settings from `path`, writing defaults there if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "Config file not found, creating default config");
            let settings = Settings::default();
            if let Err(e) = settings.save(path) {
                // Read-only config dirs should not block watermarking
                warn!(path = %path.display(), error = ?e, "Failed to write default config");
            }
            return Ok(settings);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let mut settings: Settings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON from {}", path.display()))?;
        settings.validate_and_clamp();

        info!(path = %path.display(), "Loaded config");
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        fs::write(path, json).with_context(|| format!("Failed to write config to {}", path.display()))?;

        info!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Clamp config values to safe ranges
    fn validate_and_clamp(&mut self) {
        use crate::constants::validation::*;

        if self.jpeg_quality < MIN_JPEG_QUALITY {
            warn!(jpeg_quality = self.jpeg_quality, min = MIN_JPEG_QUALITY, "jpeg_quality below minimum, clamping");
            self.jpeg_quality = MIN_JPEG_QUALITY;
        } else if self.jpeg_quality > MAX_JPEG_QUALITY {
            warn!(jpeg_quality = self.jpeg_quality, max = MAX_JPEG_QUALITY, "jpeg_quality exceeds maximum, clamping");
            self.jpeg_quality = MAX_JPEG_QUALITY;
        }

        let folder = self.tool_folder.trim();
        if folder.is_empty() || folder.contains(['/', '\\']) || folder == ".." {
            warn!(tool_folder = %self.tool_folder, using = paths::DEFAULT_TOOL_FOLDER, "tool_folder is not a plain folder name, using default");
            self.tool_folder = default_tool_folder();
        }

        if self.font_family.trim().is_empty() {
            self.font_family = default_font_family();
        }
    }
}
