// src/display/driver.rs
//! PlatformDriver trait - minimal RISC interface for platform-specific primitives.
//!
//! This trait defines the minimal set of native operations required to open
//! windows, enumerate monitors and read input state. All policy (capability
//! checks, color management, GPU fallback, handle lifetimes) lives in
//! `System`.
//!
//! ## Threading Model
//! - Every request runs on the thread that owns the `System` (the UI thread)
//! - Communication is message-based; the driver never calls back into `System`
//!
//! ## Lifecycle
//! 1. Construction - pure setup, no windows
//! 2. `handle_request(Init)` - report capabilities and native pixel format
//! 3. Request/response loop
//! 4. `handle_request(Shutdown)` - release every native window still open

use crate::display::messages::{DriverError, DriverRequest, DriverResponse};
use crate::services::{Menus, NativeDialogs};

/// One implementation per target platform, selected at startup by
/// `drivers::create_driver`.
pub trait PlatformDriver {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Handle a request from the `System`, returning its response.
    ///
    /// ## Request/Response Pairs
    /// - `Init` → `InitComplete`
    /// - `CreateWindow` → `WindowCreated` (or `GpuUnavailable` when a GPU
    ///   context was requested and cannot be created)
    /// - `DestroyWindow` → `WindowDestroyed`
    /// - `ResizeWindow` → `WindowResized`
    /// - `SetTitle` → `TitleSet`
    /// - `WindowMonitor` → `Monitor`
    /// - `MoveWindow` → `WindowMoved`
    /// - `ListMonitors` → `Monitors`
    /// - `PollEvents` → `Events`
    /// - `KeyState` → `KeyPressed`
    /// - `KeyModifiers` → `Modifiers`
    /// - `KeyMapping` → `Mapping`
    /// - lifecycle hooks → `Applied`
    /// - `Shutdown` → `ShutdownComplete`
    fn handle_request(&mut self, request: DriverRequest) -> Result<DriverResponse, DriverError>;

    /// Native menu bar integration, if the platform has one.
    fn menus(&mut self) -> Option<Box<dyn Menus>> {
        log::trace!("PlatformDriver::menus not implemented for this backend.");
        None
    }

    /// Native file dialogs, if the platform has them.
    fn native_dialogs(&mut self) -> Option<Box<dyn NativeDialogs>> {
        log::trace!("PlatformDriver::native_dialogs not implemented for this backend.");
        None
    }
}
