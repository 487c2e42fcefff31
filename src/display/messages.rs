// src/display/messages.rs
//! Message types for communication between the `System` and a `PlatformDriver`.
//!
//! All native operations are expressed as a request answered by exactly one
//! response, so a backend only has to implement `handle_request`.

use crate::capabilities::Capabilities;
use crate::color_space::ColorSpaceDescriptor;
use crate::config::AppMode;
use crate::keys::{KeyMapping, KeyModifiers, KeyScancode};
use crate::surface::PixelFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Backend handle of a native window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// Backend handle of a physical monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonitorId(pub u32);

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "monitor#{}", self.0)
    }
}

/// A connected monitor and its color profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorInfo {
    pub id: MonitorId,
    pub name: String,
    /// `None` when the monitor reports no profile (treated as sRGB).
    #[serde(default)]
    pub color_profile: Option<ColorSpaceDescriptor>,
    #[serde(default)]
    pub primary: bool,
}

/// Parameters of a native window. Sizes are physical pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec {
    pub width_px: u32,
    pub height_px: u32,
    pub scale: u32,
    pub gpu_acceleration: bool,
    pub title: String,
}

/// Requests sent from the `System` to the driver.
#[derive(Debug, Clone)]
pub enum DriverRequest {
    /// Finish backend initialization and report what the platform can do.
    Init,

    /// Open a native window.
    CreateWindow(WindowSpec),
    /// Release a native window.
    DestroyWindow(WindowId),
    ResizeWindow {
        window: WindowId,
        width_px: u32,
        height_px: u32,
        scale: u32,
    },
    SetTitle {
        window: WindowId,
        title: String,
    },
    /// Which monitor currently shows the window.
    WindowMonitor(WindowId),
    MoveWindow {
        window: WindowId,
        monitor: MonitorId,
    },
    ListMonitors,

    /// Fetch pending native events.
    PollEvents,
    /// Live state of a key, independent of the event queue.
    KeyState(KeyScancode),
    KeyModifiers,
    /// What the active layout produced for a scancode.
    KeyMapping(KeyScancode),

    SetAppName(String),
    SetAppMode(AppMode),
    ActivateApp,
    FinishLaunching,
    UseWintab(bool),

    /// Release every native resource still held.
    Shutdown,
}

/// Responses sent from the driver to the `System`.
#[derive(Debug)]
pub enum DriverResponse {
    InitComplete {
        capabilities: Capabilities,
        native_format: PixelFormat,
    },
    WindowCreated {
        window: WindowId,
        gpu_accelerated: bool,
    },
    WindowDestroyed,
    WindowResized,
    TitleSet,
    Monitor(MonitorId),
    WindowMoved,
    Monitors(Vec<MonitorInfo>),
    Events(Vec<DriverEvent>),
    KeyPressed(bool),
    Modifiers(KeyModifiers),
    Mapping(KeyMapping),
    /// Lifecycle hook applied.
    Applied,
    ShutdownComplete,
}

/// Native events reported by `PollEvents`.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    KeyDown {
        scancode: KeyScancode,
        modifiers: KeyModifiers,
        unicode: Option<char>,
    },
    KeyUp {
        scancode: KeyScancode,
        modifiers: KeyModifiers,
    },
    CloseRequested(WindowId),
    Resized {
        window: WindowId,
        width_px: u32,
        height_px: u32,
    },
    MonitorChanged {
        window: WindowId,
        monitor: MonitorId,
    },
    /// Files opened from the shell (drag and drop, DDE, Finder "open").
    DropFiles(Vec<PathBuf>),
}

/// Failures reported by a driver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    #[error("Driver not initialized")]
    NotInitialized,
    #[error("Driver already shut down")]
    ShutDown,
    #[error("GPU acceleration unavailable")]
    GpuUnavailable,
    #[error("Native layer refused: {0}")]
    Refused(String),
    #[error("Unknown {0}")]
    UnknownWindow(WindowId),
    #[error("Unknown {0}")]
    UnknownMonitor(MonitorId),
    #[error("Unsupported by this backend: {0}")]
    Unsupported(&'static str),
    #[error("Unexpected response to {request}: {response}")]
    UnexpectedResponse { request: String, response: String },
}

impl DriverError {
    pub(crate) fn unexpected(request: &str, response: &DriverResponse) -> Self {
        DriverError::UnexpectedResponse {
            request: request.to_string(),
            response: format!("{:?}", response),
        }
    }
}
