//! Configuration management for Tessera
//!
//! This module handles loading, parsing, and validating configuration
//! from TOML files: frame decoration geometry, focus policy, the fallback
//! screen size for headless runs, and general settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::frame::DecorationStyle;
use crate::geometry::{DecorationEdge, Rect};

/// Main configuration struct containing all Tessera settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TesseraConfig {
    /// Frame layout and focus policy
    #[serde(default)]
    pub frames: FrameConfig,

    /// Screen used when no geometry provider is attached
    #[serde(default)]
    pub screen: ScreenConfig,

    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,
}

/// Frame layout and focus policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FrameConfig {
    /// Height of the tab strip carved out of every frame (pixels)
    pub decoration_thickness: u32,

    /// Which edge of the frame carries the tab strip ("top", "bottom")
    pub decoration_edge: DecorationEdge,

    /// Focus windows as soon as they appear
    pub focus_new_windows: bool,

    /// Make the target frame active after moving a window into it
    pub follow_moved_window: bool,
}

/// Fallback screen geometry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScreenConfig {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable debug logging
    pub debug: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            decoration_thickness: 24,
            decoration_edge: DecorationEdge::Top,
            focus_new_windows: true,
            follow_moved_window: true,
        }
    }
}

impl FrameConfig {
    pub fn decoration(&self) -> DecorationStyle {
        DecorationStyle {
            thickness: self.decoration_thickness,
            edge: self.decoration_edge,
        }
    }
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 1920,
            height: 1080,
        }
    }
}

impl ScreenConfig {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

impl TesseraConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Expand ~ to home directory
        let expanded_path = if path.to_string_lossy().starts_with('~') {
            let home = std::env::var("HOME").context("Failed to get HOME environment variable")?;
            let rest = path
                .strip_prefix("~")
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.to_path_buf());
            Path::new(&home).join(rest)
        } else {
            path.to_path_buf()
        };

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        let config: TesseraConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.screen.width == 0 || self.screen.height == 0 {
            anyhow::bail!(
                "Invalid screen size {}x{}: both dimensions must be non-zero",
                self.screen.width,
                self.screen.height
            );
        }

        // A frame must keep some content area after its tab strip.
        if self.frames.decoration_thickness >= self.screen.height {
            anyhow::bail!(
                "Invalid decoration_thickness {}: must be smaller than the screen height {}",
                self.frames.decoration_thickness,
                self.screen.height
            );
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, contents).context("Failed to write configuration file")?;

        Ok(())
    }

    /// Merge a partial configuration into this one.
    /// Sections of `partial` that differ from the defaults override this config.
    pub fn merge_partial(mut self, partial: TesseraConfig) -> Self {
        let default_config = TesseraConfig::default();

        if partial.frames != default_config.frames {
            self.frames = partial.frames;
        }
        if partial.screen != default_config.screen {
            self.screen = partial.screen;
        }
        if partial.general != default_config.general {
            self.general = partial.general;
        }

        self
    }
}

#[cfg(test)]
mod tests;

#[cfg(test)]
mod property_tests;
