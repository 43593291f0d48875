// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor settings.
//!
//! Stored as RON. Every field falls back to its default, so a settings file
//! only needs to name the values it changes.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Settings file name looked up in the working directory
pub const SETTINGS_FILE_NAME: &str = "mixline.ron";

/// Error loading or saving settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// File could not be read or written
    #[error("Settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid settings RON
    #[error("Invalid settings: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be encoded
    #[error("Could not encode settings: {0}")]
    Serialize(#[from] ron::Error),

    /// File was written by a newer version
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },
}

/// Canvas geometry and interaction tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSettings {
    /// Height of the node title bar
    pub header_height: f32,
    /// Vertical distance between port rows
    pub port_spacing: f32,
    /// Drawn port radius
    pub port_radius: f32,
    /// Pointer distance that counts as hitting a port
    pub hit_radius: f32,
    /// Background grid spacing
    pub grid_spacing: f32,
    /// Smallest zoom factor
    pub min_zoom: f32,
    /// Largest zoom factor
    pub max_zoom: f32,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            header_height: 24.0,
            port_spacing: 22.0,
            port_radius: 6.0,
            hit_radius: 9.0,
            grid_spacing: 20.0,
            min_zoom: 0.1,
            max_zoom: 5.0,
        }
    }
}

impl CanvasSettings {
    /// Clamp a zoom factor to the configured range
    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        zoom.clamp(self.min_zoom, self.max_zoom.max(self.min_zoom))
    }
}

/// Editor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorSettings {
    /// Format version
    #[serde(default = "default_version")]
    pub version: u32,
    /// Canvas geometry
    #[serde(default)]
    pub canvas: CanvasSettings,
}

fn default_version() -> u32 {
    SETTINGS_FORMAT_VERSION
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            canvas: CanvasSettings::default(),
        }
    }
}

impl EditorSettings {
    /// Parse settings from RON text
    pub fn from_ron(content: &str) -> Result<Self, SettingsError> {
        let settings: EditorSettings = ron::from_str(content)?;

        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }

        Ok(settings)
    }

    /// Encode settings as pretty RON
    pub fn to_ron(&self) -> Result<String, SettingsError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Load settings from a file, falling back to defaults if it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            tracing::info!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization() {
        let mut settings = EditorSettings::default();
        settings.canvas.port_spacing = 30.0;
        let ron_str = settings.to_ron().unwrap();
        let loaded = EditorSettings::from_ron(&ron_str).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let loaded = EditorSettings::from_ron("(canvas: (hit_radius: 12.0))").unwrap();
        assert_eq!(loaded.version, SETTINGS_FORMAT_VERSION);
        assert_eq!(loaded.canvas.hit_radius, 12.0);
        assert_eq!(loaded.canvas.header_height, 24.0);
    }

    #[test]
    fn test_newer_version_rejected() {
        let result = EditorSettings::from_ron("(version: 99)");
        assert!(matches!(
            result,
            Err(SettingsError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let path = Path::new("definitely/not/here/mixline.ron");
        assert_eq!(EditorSettings::load_or_default(path).unwrap(), EditorSettings::default());
    }

    #[test]
    fn test_clamp_zoom() {
        let canvas = CanvasSettings::default();
        assert_eq!(canvas.clamp_zoom(10.0), 5.0);
        assert_eq!(canvas.clamp_zoom(0.01), 0.1);
    }
}
