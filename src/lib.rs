// src/lib.rs

//! Cross-platform display and surface layer.
//!
//! One `System` per process negotiates what the platform backend can do and
//! hands out displays (native windows), surfaces (pixel buffers), fonts and
//! color-space conversions under one consistent color and lifetime policy.

// Declare modules
pub mod capabilities;
pub mod color;
pub mod color_space;
pub mod config;
pub mod conversion;
pub mod display;
pub mod error;
pub mod event_queue;
pub mod font;
pub mod keys;
mod lifetime;
pub mod services;
pub mod surface;
pub mod system;

pub use capabilities::Capabilities;
pub use color::Rgba;
pub use color_space::{
    ColorSpace, ColorSpaceDescriptor, ColorSpaceRef, DisplayColorSpace, Primaries, TransferFn,
};
pub use config::{AppMode, SystemConfig};
pub use conversion::ColorSpaceConversion;
pub use display::drivers::{HeadlessControl, HeadlessDriver};
pub use display::{Display, MonitorId, PlatformDriver, WindowId};
pub use error::{ResourceKind, Result, SystemError};
pub use event_queue::{Event, EventQueue};
pub use font::{Font, FontKind, FontManager, FontMetrics};
pub use keys::{DeadKey, KeyMapping, KeyModifiers, KeyScancode};
pub use services::{FileDialogRequest, Logger, MenuItem, Menus, NativeDialogs};
pub use surface::{PixelFormat, Surface};
pub use system::{create_system, instance_exists, with_instance, System, SystemGuard};
