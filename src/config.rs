// src/config.rs

//! Defines the configuration structures for a `System`.
//!
//! Every section has defaults, so a configuration file only needs to name
//! the settings it changes. Files are JSON.

use crate::capabilities::Capabilities;
use crate::color_space::{ColorSpaceDescriptor, Primaries, TransferFn};
use crate::display::messages::{MonitorId, MonitorInfo};
use crate::surface::PixelFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

// --- Top-Level Configuration Structure ---

/// Complete configuration of a `System`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct SystemConfig {
    /// Application identity and mode.
    pub app: AppConfig,
    /// Display defaults.
    pub display: DisplayConfig,
    /// Keyboard behaviour.
    pub input: InputConfig,
    /// Backend selection and platform integration.
    pub platform: PlatformConfig,
    /// Parameters of the headless backend.
    pub headless: HeadlessConfig,
}

impl SystemConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse system configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("Invalid config file '{}'", path.display()))
    }

    /// Loads `path` when it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::info!(
                "Config file '{}' not found, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize system configuration")
    }
}

// --- Application Configuration ---

/// Whether the application runs with a user interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppMode {
    /// Regular windowed application (shown in the dock/taskbar).
    #[default]
    Gui,
    /// Command-line run; the platform should not show the app in the dock.
    Cli,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Used by the platform to route shell "open file" requests (DDE on
    /// Windows) to a running instance.
    pub name: String,
    pub mode: AppMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            name: "displaykit".to_string(),
            mode: AppMode::Gui,
        }
    }
}

// --- Display Configuration ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Logical size of new default displays.
    pub default_width: i32,
    pub default_height: i32,
    pub default_scale: i32,
    /// Open the default display while the `System` starts.
    pub open_default_display: bool,
    /// Default color space of displays. `None` tracks the active monitor.
    pub color_space: Option<ColorSpaceDescriptor>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            default_width: 1024,
            default_height: 768,
            default_scale: 1,
            open_default_display: false,
            color_space: None,
        }
    }
}

// --- Input Configuration ---

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    /// Apply dead-key composition to scancode lookups. Off gives
    /// shortcut-style mapping.
    pub translate_dead_keys: bool,
}

// --- Platform Configuration ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-process backend without a windowing system.
    #[default]
    Headless,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlatformConfig {
    pub backend: BackendKind,
    /// Preferred rendering path for new displays.
    pub gpu_acceleration: bool,
    /// Load the Wintab tablet API on Windows.
    pub use_wintab: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        PlatformConfig {
            backend: BackendKind::Headless,
            gpu_acceleration: false,
            use_wintab: true,
        }
    }
}

// --- Headless Backend Configuration ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeadlessConfig {
    pub capabilities: Capabilities,
    pub native_format: PixelFormat,
    /// Whether GPU-backed windows can be created.
    pub gpu_available: bool,
    /// Largest physical window edge the simulated windowing layer accepts.
    pub max_window_px: u32,
    pub monitors: Vec<MonitorInfo>,
    /// Offer native menus and dialogs.
    pub native_services: bool,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        HeadlessConfig {
            capabilities: Capabilities::all(),
            native_format: PixelFormat::Bgra8,
            gpu_available: true,
            max_window_px: 16384,
            monitors: vec![
                MonitorInfo {
                    id: MonitorId(0),
                    name: "Built-in".to_string(),
                    color_profile: Some(ColorSpaceDescriptor::Rgb {
                        name: "Built-in sRGB".to_string(),
                        transfer: TransferFn::Srgb,
                        primaries: Primaries::SRGB,
                    }),
                    primary: true,
                },
                MonitorInfo {
                    id: MonitorId(1),
                    name: "External".to_string(),
                    color_profile: Some(ColorSpaceDescriptor::display_p3()),
                    primary: false,
                },
            ],
            native_services: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_fill_missing_sections_with_defaults() -> Result<()> {
        let config = SystemConfig::from_json_str(
            r#"{ "app": { "name": "Paint" }, "platform": { "gpu_acceleration": true } }"#,
        )?;
        assert_eq!(config.app.name, "Paint");
        assert_eq!(config.app.mode, AppMode::Gui);
        assert!(config.platform.gpu_acceleration);
        assert_eq!(config.display, DisplayConfig::default());
        assert_eq!(config.headless.monitors.len(), 2);
        Ok(())
    }

    #[test]
    fn it_should_round_trip_through_json() -> Result<()> {
        let mut config = SystemConfig::default();
        config.display.color_space = Some(ColorSpaceDescriptor::adobe_rgb());
        config.headless.capabilities = Capabilities::COLOR_SPACES | Capabilities::DISPLAY_SCALE;
        let json = config.to_json_string()?;
        assert_eq!(SystemConfig::from_json_str(&json)?, config);
        Ok(())
    }

    #[test]
    fn it_should_reject_malformed_json() {
        assert!(SystemConfig::from_json_str("{ not json").is_err());
    }

    #[test]
    fn it_should_default_when_the_file_is_missing() -> Result<()> {
        let config = SystemConfig::load_or_default(Path::new("/nonexistent/displaykit.json"))?;
        assert_eq!(config, SystemConfig::default());
        Ok(())
    }
}
