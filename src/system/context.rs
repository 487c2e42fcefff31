// src/system/context.rs
//! Shared state behind a `System` and every handle it gives out.
//!
//! The context owns the platform driver and the cross-cutting policy
//! (capabilities, native pixel format, default display color space). Handles
//! keep an `Rc<Context>` so they can reach the driver (a display destroying
//! its window) and the policy (a display resolving its color space) without
//! a global.

use crate::capabilities::Capabilities;
use crate::color_space::{ColorSpace, ColorSpaceDescriptor, ColorSpaceRef, DisplayColorSpace};
use crate::display::driver::PlatformDriver;
use crate::display::messages::{
    DriverError, DriverEvent, DriverRequest, DriverResponse, MonitorId, MonitorInfo, WindowId,
};
use crate::error::Result;
use crate::keys::{KeyMapping, KeyModifiers, KeyScancode};
use crate::lifetime::Lifetime;
use crate::surface::PixelFormat;
use log::{debug, info, trace};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub(crate) struct Context {
    driver: RefCell<Box<dyn PlatformDriver>>,
    driver_name: &'static str,
    lifetime: Rc<Lifetime>,
    capabilities: Capabilities,
    native_format: PixelFormat,
    displays_color_space: RefCell<DisplayColorSpace>,
    monitor_spaces: RefCell<HashMap<MonitorId, ColorSpaceRef>>,
    srgb: ColorSpaceRef,
}

impl Context {
    /// Runs backend initialization and caches what it reports.
    pub(crate) fn init(mut driver: Box<dyn PlatformDriver>) -> Result<Rc<Self>> {
        let driver_name = driver.name();
        info!("Context: initializing '{}' driver", driver_name);
        let response = driver.handle_request(DriverRequest::Init)?;
        let DriverResponse::InitComplete {
            capabilities,
            native_format,
        } = response
        else {
            return Err(DriverError::unexpected("Init", &response).into());
        };
        info!(
            "Context: '{}' ready - capabilities {:?}, native format {:?}",
            driver_name, capabilities, native_format
        );
        Ok(Rc::new(Self {
            driver: RefCell::new(driver),
            driver_name,
            lifetime: Lifetime::new(),
            capabilities,
            native_format,
            displays_color_space: RefCell::new(DisplayColorSpace::FollowActiveMonitor),
            monitor_spaces: RefCell::new(HashMap::new()),
            srgb: ColorSpace::shared(ColorSpaceDescriptor::srgb()),
        }))
    }

    /// Forward a request to the driver.
    pub(crate) fn request(&self, request: DriverRequest) -> Result<DriverResponse, DriverError> {
        self.driver.borrow_mut().handle_request(request)
    }

    pub(crate) fn with_driver<R>(&self, f: impl FnOnce(&mut dyn PlatformDriver) -> R) -> R {
        f(self.driver.borrow_mut().as_mut())
    }

    pub(crate) fn driver_name(&self) -> &'static str {
        self.driver_name
    }

    pub(crate) fn lifetime(&self) -> &Rc<Lifetime> {
        &self.lifetime
    }

    pub(crate) fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub(crate) fn native_format(&self) -> PixelFormat {
        self.native_format
    }

    pub(crate) fn srgb(&self) -> &ColorSpaceRef {
        &self.srgb
    }

    pub(crate) fn displays_color_space(&self) -> DisplayColorSpace {
        self.displays_color_space.borrow().clone()
    }

    pub(crate) fn set_displays_color_space(&self, policy: DisplayColorSpace) {
        *self.displays_color_space.borrow_mut() = policy;
    }

    // --- Typed wrappers over the request/response protocol ---

    pub(crate) fn monitors(&self) -> Result<Vec<MonitorInfo>, DriverError> {
        match self.request(DriverRequest::ListMonitors)? {
            DriverResponse::Monitors(monitors) => Ok(monitors),
            other => Err(DriverError::unexpected("ListMonitors", &other)),
        }
    }

    pub(crate) fn window_monitor(&self, window: WindowId) -> Result<MonitorId, DriverError> {
        match self.request(DriverRequest::WindowMonitor(window))? {
            DriverResponse::Monitor(monitor) => Ok(monitor),
            other => Err(DriverError::unexpected("WindowMonitor", &other)),
        }
    }

    pub(crate) fn destroy_window(&self, window: WindowId) -> Result<(), DriverError> {
        match self.request(DriverRequest::DestroyWindow(window))? {
            DriverResponse::WindowDestroyed => Ok(()),
            other => Err(DriverError::unexpected("DestroyWindow", &other)),
        }
    }

    pub(crate) fn poll_events(&self) -> Result<Vec<DriverEvent>, DriverError> {
        match self.request(DriverRequest::PollEvents)? {
            DriverResponse::Events(events) => Ok(events),
            other => Err(DriverError::unexpected("PollEvents", &other)),
        }
    }

    pub(crate) fn key_pressed(&self, scancode: KeyScancode) -> Result<bool, DriverError> {
        match self.request(DriverRequest::KeyState(scancode))? {
            DriverResponse::KeyPressed(pressed) => Ok(pressed),
            other => Err(DriverError::unexpected("KeyState", &other)),
        }
    }

    pub(crate) fn key_modifiers(&self) -> Result<KeyModifiers, DriverError> {
        match self.request(DriverRequest::KeyModifiers)? {
            DriverResponse::Modifiers(modifiers) => Ok(modifiers),
            other => Err(DriverError::unexpected("KeyModifiers", &other)),
        }
    }

    pub(crate) fn key_mapping(&self, scancode: KeyScancode) -> Result<KeyMapping, DriverError> {
        match self.request(DriverRequest::KeyMapping(scancode))? {
            DriverResponse::Mapping(mapping) => Ok(mapping),
            other => Err(DriverError::unexpected("KeyMapping", &other)),
        }
    }

    /// Sends a lifecycle hook that answers with `Applied`.
    pub(crate) fn apply(&self, request: DriverRequest) -> Result<(), DriverError> {
        let name = format!("{:?}", request);
        match self.request(request)? {
            DriverResponse::Applied => Ok(()),
            other => Err(DriverError::unexpected(&name, &other)),
        }
    }

    pub(crate) fn shutdown(&self) -> Result<(), DriverError> {
        match self.request(DriverRequest::Shutdown)? {
            DriverResponse::ShutdownComplete => Ok(()),
            other => Err(DriverError::unexpected("Shutdown", &other)),
        }
    }

    // --- Color management ---

    /// Color space of a monitor's profile. sRGB when the monitor has no
    /// profile, is not listed by the backend, or the backend does no color
    /// management.
    pub(crate) fn monitor_color_space(&self, monitor: MonitorId) -> Result<ColorSpaceRef> {
        if !self.capabilities.has(Capabilities::COLOR_SPACES) {
            return Ok(self.srgb.clone());
        }
        match self.monitors()?.into_iter().find(|m| m.id == monitor) {
            Some(info) => Ok(self.profile_space(&info)),
            None => {
                debug!("Context: {} is not listed, assuming sRGB", monitor);
                Ok(self.srgb.clone())
            }
        }
    }

    /// Shared handle for a monitor's profile, reused while the profile is
    /// unchanged.
    pub(crate) fn profile_space(&self, info: &MonitorInfo) -> ColorSpaceRef {
        let descriptor = info
            .color_profile
            .clone()
            .unwrap_or_else(ColorSpaceDescriptor::srgb);
        let mut cache = self.monitor_spaces.borrow_mut();
        if let Some(cached) = cache.get(&info.id) {
            if *cached.descriptor() == descriptor {
                trace!("Context: monitor {} profile cache hit", info.id);
                return cached.clone();
            }
        }
        debug!(
            "Context: monitor {} uses color space '{}'",
            info.id,
            descriptor.name()
        );
        let space = ColorSpace::shared(descriptor);
        cache.insert(info.id, space.clone());
        space
    }
}
