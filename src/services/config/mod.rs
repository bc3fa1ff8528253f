// Config service module
// Grid geometry read from an optional calendar.toml in the platform config directory

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::scheduling::drag::MIN_DRAG_PIXELS;
use crate::scheduling::time_grid::DEFAULT_SLOT_HEIGHT;

pub const CONFIG_FILE_NAME: &str = "calendar.toml";

/// Room for the day names above each column.
const DEFAULT_HEADER_HEIGHT_PX: f32 = 28.0;

/// Pixel geometry of the calendar grid. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Height of the day-name header above the slots
    pub header_height_px: f32,
    pub slot_height_px: f32,
    /// Pointer travel below which a drag is treated as a click
    pub min_drag_pixels: f32,
    /// Width of the time label gutter left of the day columns
    pub time_label_width_px: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            header_height_px: DEFAULT_HEADER_HEIGHT_PX,
            slot_height_px: DEFAULT_SLOT_HEIGHT,
            min_drag_pixels: MIN_DRAG_PIXELS,
            time_label_width_px: 50.0,
        }
    }
}

impl GridConfig {
    /// Reads and parses `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: GridConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Like [`GridConfig::load`], but a missing or broken file yields defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No grid config at {}; using defaults", path.display());
            return Self::default();
        }

        match Self::load(path) {
            Ok(config) => {
                log::info!("Loaded grid config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("{:#}; using default grid config", e);
                Self::default()
            }
        }
    }

    /// Loads `calendar.toml` from the platform config directory.
    pub fn load_default() -> Self {
        match default_config_path() {
            Some(path) => Self::load_or_default(&path),
            None => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = toml::to_string_pretty(self).context("Failed to serialize grid config")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, raw).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "VetClinic", "VetCalendar")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = GridConfig::load_or_default(&dir.path().join("absent.toml"));
        assert_eq!(config, GridConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "slot_height_px = 24.0\nheader_height_px = 32.0\n").unwrap();

        let config = GridConfig::load(&path).unwrap();
        assert_eq!(config.slot_height_px, 24.0);
        assert_eq!(config.header_height_px, 32.0);
        assert_eq!(config.min_drag_pixels, MIN_DRAG_PIXELS);
    }

    #[test]
    fn test_broken_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "slot_height_px = \"tall\"").unwrap();

        assert!(GridConfig::load(&path).is_err());
        assert_eq!(GridConfig::load_or_default(&path), GridConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let config = GridConfig {
            min_drag_pixels: 6.0,
            ..GridConfig::default()
        };

        config.save(&path).unwrap();
        assert_eq!(GridConfig::load(&path).unwrap(), config);
    }
}
