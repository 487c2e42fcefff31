// src/display/window.rs
//! `Display`: an owned native window plus its backing surface.
//!
//! Sizes passed in and reported out are logical. The backing surface is
//! allocated in physical pixels (`width * scale` by `height * scale`) in the
//! backend's native pixel format.

use crate::capabilities::Capabilities;
use crate::color_space::{ColorSpaceRef, DisplayColorSpace};
use crate::display::messages::{
    DriverError, DriverRequest, DriverResponse, MonitorId, WindowId, WindowSpec,
};
use crate::error::{ResourceKind, Result, SystemError};
use crate::lifetime::{HandleKind, HandleToken};
use crate::surface::{checked_size, Surface};
use crate::system::context::Context;
use log::{debug, info, warn};
use std::fmt;
use std::rc::Rc;

fn checked_scale(scale: i32) -> Result<u32> {
    if scale <= 0 {
        return Err(SystemError::invalid(format!(
            "display scale must be positive, got {}",
            scale
        )));
    }
    Ok(scale as u32)
}

fn physical(width: u32, height: u32, scale: u32) -> Result<(u32, u32)> {
    match (width.checked_mul(scale), height.checked_mul(scale)) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(SystemError::invalid(format!(
            "{}x{} at scale {} overflows the pixel range",
            width, height, scale
        ))),
    }
}

pub struct Display {
    context: Rc<Context>,
    token: HandleToken,
    window: WindowId,
    width: u32,
    height: u32,
    scale: u32,
    surface: Surface,
    color_space: Option<ColorSpaceRef>,
    gpu_accelerated: bool,
    title: String,
    is_default: bool,
}

impl Display {
    /// Validates the request against the backend's capabilities and opens
    /// the native window.
    ///
    /// A refused GPU request is retried once without acceleration; every
    /// other refusal is reported as `CreationFailed`.
    pub(crate) fn open(
        context: Rc<Context>,
        width: i32,
        height: i32,
        scale: i32,
        gpu_acceleration: bool,
        title: String,
        is_default: bool,
    ) -> Result<Self> {
        let (width, height) = checked_size(width, height)?;
        let scale = checked_scale(scale)?;
        let caps = context.capabilities();
        if scale > 1 && !caps.has(Capabilities::DISPLAY_SCALE) {
            return Err(SystemError::UnsupportedCapability(Capabilities::DISPLAY_SCALE));
        }
        let (open_displays, _) = context.lifetime().outstanding();
        if open_displays > 0 && !caps.has(Capabilities::MULTIPLE_DISPLAYS) {
            return Err(SystemError::UnsupportedCapability(
                Capabilities::MULTIPLE_DISPLAYS,
            ));
        }
        let (width_px, height_px) = physical(width, height, scale)?;

        let spec = WindowSpec {
            width_px,
            height_px,
            scale,
            gpu_acceleration,
            title: title.clone(),
        };
        let response = match context.request(DriverRequest::CreateWindow(spec.clone())) {
            Err(DriverError::GpuUnavailable) if gpu_acceleration => {
                warn!(
                    "Display: GPU acceleration unavailable on '{}', falling back to software",
                    context.driver_name()
                );
                context.request(DriverRequest::CreateWindow(WindowSpec {
                    gpu_acceleration: false,
                    ..spec
                }))
            }
            other => other,
        }
        .map_err(|e| SystemError::driver_creation(ResourceKind::Display, e))?;

        let DriverResponse::WindowCreated {
            window,
            gpu_accelerated,
        } = response
        else {
            return Err(SystemError::driver_creation(
                ResourceKind::Display,
                DriverError::unexpected("CreateWindow", &response),
            ));
        };

        let backing = HandleToken::new(context.lifetime(), HandleKind::BackingSurface);
        let surface = match Surface::new(width_px, height_px, context.native_format(), None, backing)
        {
            Ok(surface) => surface,
            Err(e) => {
                if let Err(destroy) = context.destroy_window(window) {
                    warn!("Display: failed to release {}: {}", window, destroy);
                }
                return Err(SystemError::creation(ResourceKind::Display, e.to_string()));
            }
        };

        let token = HandleToken::new(context.lifetime(), HandleKind::Display);
        let mut display = Self {
            context,
            token,
            window,
            width,
            height,
            scale,
            surface,
            color_space: None,
            gpu_accelerated,
            title,
            is_default,
        };
        // Dropping `display` on failure closes the window.
        display.retag_surface().map_err(|e| match e {
            SystemError::Driver(e) => SystemError::driver_creation(ResourceKind::Display, e),
            other => other,
        })?;
        info!(
            "Display: opened {} {}x{} @{}x (gpu={}, default={})",
            window, width, height, scale, gpu_accelerated, is_default
        );
        Ok(display)
    }

    fn retag_surface(&mut self) -> Result<()> {
        let effective = self.color_space()?;
        self.surface.set_color_space(Some(effective))
    }

    /// False once the owning `System` has been disposed.
    pub fn is_valid(&self) -> bool {
        self.token.is_alive()
    }

    pub fn window_id(&self) -> Result<WindowId> {
        self.token.check()?;
        Ok(self.window)
    }

    /// Logical size.
    pub fn size(&self) -> Result<(u32, u32)> {
        self.token.check()?;
        Ok((self.width, self.height))
    }

    pub fn width(&self) -> Result<u32> {
        Ok(self.size()?.0)
    }

    pub fn height(&self) -> Result<u32> {
        Ok(self.size()?.1)
    }

    pub fn scale(&self) -> Result<u32> {
        self.token.check()?;
        Ok(self.scale)
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn gpu_accelerated(&self) -> Result<bool> {
        self.token.check()?;
        Ok(self.gpu_accelerated)
    }

    /// Changes the logical size. The backing surface is reallocated and its
    /// contents are lost.
    pub fn resize(&mut self, width: i32, height: i32) -> Result<()> {
        self.token.check()?;
        if !self.context.capabilities().has(Capabilities::CAN_RESIZE_DISPLAY) {
            return Err(SystemError::UnsupportedCapability(
                Capabilities::CAN_RESIZE_DISPLAY,
            ));
        }
        let (width, height) = checked_size(width, height)?;
        self.apply_geometry(width, height, self.scale)
    }

    /// Changes the scale factor, keeping the logical size.
    pub fn set_scale(&mut self, scale: i32) -> Result<()> {
        self.token.check()?;
        let scale = checked_scale(scale)?;
        if scale == self.scale {
            return Ok(());
        }
        if !self.context.capabilities().has(Capabilities::DISPLAY_SCALE) {
            return Err(SystemError::UnsupportedCapability(Capabilities::DISPLAY_SCALE));
        }
        self.apply_geometry(self.width, self.height, scale)
    }

    fn apply_geometry(&mut self, width: u32, height: u32, scale: u32) -> Result<()> {
        let (width_px, height_px) = physical(width, height, scale)?;
        match self.context.request(DriverRequest::ResizeWindow {
            window: self.window,
            width_px,
            height_px,
            scale,
        })? {
            DriverResponse::WindowResized => {}
            other => return Err(DriverError::unexpected("ResizeWindow", &other).into()),
        }
        let backing = HandleToken::new(self.context.lifetime(), HandleKind::BackingSurface);
        self.surface = Surface::new(
            width_px,
            height_px,
            self.context.native_format(),
            None,
            backing,
        )?;
        self.width = width;
        self.height = height;
        self.scale = scale;
        debug!(
            "Display: {} now {}x{} @{}x",
            self.window, width, height, scale
        );
        self.retag_surface()
    }

    /// The backing surface, as last tagged.
    ///
    /// A move made outside this handle (the user dragging the window to
    /// another monitor) is not reflected in the tag until the next
    /// `surface_mut`, `move_to_monitor` or `set_color_space`.
    /// `color_space()` always reports the current effective space.
    pub fn surface(&self) -> Result<&Surface> {
        self.token.check()?;
        Ok(&self.surface)
    }

    /// The backing surface, retagged with the current effective color space.
    pub fn surface_mut(&mut self) -> Result<&mut Surface> {
        self.token.check()?;
        self.retag_surface()?;
        Ok(&mut self.surface)
    }

    pub fn title(&self) -> Result<&str> {
        self.token.check()?;
        Ok(&self.title)
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<()> {
        self.token.check()?;
        let title = title.into();
        match self.context.request(DriverRequest::SetTitle {
            window: self.window,
            title: title.clone(),
        })? {
            DriverResponse::TitleSet => {}
            other => return Err(DriverError::unexpected("SetTitle", &other).into()),
        }
        self.title = title;
        Ok(())
    }

    /// The per-display override. `None` means the display inherits the
    /// `System` default.
    pub fn color_space_setting(&self) -> Result<Option<&ColorSpaceRef>> {
        self.token.check()?;
        Ok(self.color_space.as_ref())
    }

    /// Sets (or with `None`, clears) the per-display override.
    pub fn set_color_space(&mut self, color_space: Option<ColorSpaceRef>) -> Result<()> {
        self.token.check()?;
        let non_srgb = color_space.as_ref().is_some_and(|cs| !cs.is_srgb());
        if non_srgb && !self.context.capabilities().has(Capabilities::COLOR_SPACES) {
            return Err(SystemError::UnsupportedCapability(Capabilities::COLOR_SPACES));
        }
        self.color_space = color_space;
        self.retag_surface()
    }

    /// Effective color space, resolved on every call.
    ///
    /// A per-display override wins over the `System` default. Without either,
    /// the profile of the monitor currently showing the window is used.
    pub fn color_space(&self) -> Result<ColorSpaceRef> {
        self.token.check()?;
        if !self.context.capabilities().has(Capabilities::COLOR_SPACES) {
            return Ok(self.context.srgb().clone());
        }
        if let Some(explicit) = &self.color_space {
            return Ok(explicit.clone());
        }
        match self.context.displays_color_space() {
            DisplayColorSpace::Explicit(cs) => Ok(cs),
            DisplayColorSpace::FollowActiveMonitor => {
                let monitor = self.context.window_monitor(self.window)?;
                self.context.monitor_color_space(monitor)
            }
        }
    }

    /// Monitor currently showing the window.
    pub fn monitor(&self) -> Result<MonitorId> {
        self.token.check()?;
        Ok(self.context.window_monitor(self.window)?)
    }

    pub fn move_to_monitor(&mut self, monitor: MonitorId) -> Result<()> {
        self.token.check()?;
        match self.context.request(DriverRequest::MoveWindow {
            window: self.window,
            monitor,
        })? {
            DriverResponse::WindowMoved => {}
            other => return Err(DriverError::unexpected("MoveWindow", &other).into()),
        }
        debug!("Display: {} moved to {}", self.window, monitor);
        self.retag_surface()
    }
}

impl fmt::Debug for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Display")
            .field("window", &self.window)
            .field("size", &(self.width, self.height))
            .field("scale", &self.scale)
            .field("gpu_accelerated", &self.gpu_accelerated)
            .field("is_default", &self.is_default)
            .field("valid", &self.token.is_alive())
            .finish()
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        // After disposal the driver has already released every window.
        if !self.token.is_alive() {
            return;
        }
        match self.context.destroy_window(self.window) {
            Ok(()) => debug!("Display: closed {}", self.window),
            Err(e) => warn!("Display: failed to close {}: {}", self.window, e),
        }
    }
}
