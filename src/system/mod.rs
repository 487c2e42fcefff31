// src/system/mod.rs
//! The coordinating `System`.
//!
//! A `System` owns the platform driver and hands out displays, surfaces,
//! fonts and color-space conversions. It negotiates capabilities once at
//! startup and applies the cross-cutting policy (GPU preference, default
//! display color space, app identity) to everything it creates.
//!
//! All handles are bound to the thread that created the `System`. Callers
//! that share one across threads must serialize access themselves.

pub(crate) mod context;
mod instance;


pub use instance::{create_system, instance_exists, with_instance, SystemGuard};

use crate::capabilities::Capabilities;
use crate::color_space::{ColorSpace, ColorSpaceDescriptor, ColorSpaceRef, DisplayColorSpace};
use crate::config::{AppMode, SystemConfig};
use crate::conversion::ColorSpaceConversion;
use crate::display::driver::PlatformDriver;
use crate::display::drivers::create_driver;
use crate::display::messages::DriverRequest;
use crate::display::Display;
use crate::error::{ResourceKind, Result, SystemError};
use crate::event_queue::EventQueue;
use crate::font::{Font, FontManager};
use crate::keys::{DeadKeyComposer, KeyModifiers, KeyScancode};
use crate::lifetime::{HandleKind, HandleToken};
use crate::services::{LogFacadeLogger, Logger, Menus, NativeDialogs};
use crate::surface::{checked_size, PixelFormat, Surface};
use context::Context;
use log::{debug, info, trace, warn};
use once_cell::unsync::OnceCell;
use std::path::Path;
use std::rc::Rc;

pub struct System {
    context: Rc<Context>,
    config: SystemConfig,
    gpu_acceleration: bool,
    translate_dead_keys: bool,
    composer: DeadKeyComposer,
    app_name: String,
    app_mode: AppMode,
    launched: bool,
    displays_opened: bool,
    default_display: Option<Display>,
    font_manager: FontManager,
    event_queue: EventQueue,
    logger: OnceCell<Box<dyn Logger>>,
    menus: OnceCell<Option<Box<dyn Menus>>>,
    native_dialogs: OnceCell<Option<Box<dyn NativeDialogs>>>,
    disposed: bool,
}

impl System {
    /// Initializes `driver` and applies `config`.
    pub fn new(config: SystemConfig, driver: Box<dyn PlatformDriver>) -> Result<Self> {
        let context = Context::init(driver)?;

        if let Some(descriptor) = &config.display.color_space {
            descriptor.validate()?;
            if !descriptor.is_srgb() && !context.capabilities().has(Capabilities::COLOR_SPACES) {
                return Err(SystemError::UnsupportedCapability(Capabilities::COLOR_SPACES));
            }
            context.set_displays_color_space(DisplayColorSpace::Explicit(ColorSpace::shared(
                descriptor.clone(),
            )));
        }

        context.apply(DriverRequest::SetAppName(config.app.name.clone()))?;
        context.apply(DriverRequest::SetAppMode(config.app.mode))?;
        context.apply(DriverRequest::UseWintab(config.platform.use_wintab))?;

        let mut system = Self {
            font_manager: FontManager::new(Rc::clone(context.lifetime())),
            event_queue: EventQueue::new(Rc::clone(&context)),
            gpu_acceleration: config.platform.gpu_acceleration,
            translate_dead_keys: config.input.translate_dead_keys,
            composer: DeadKeyComposer::new(),
            app_name: config.app.name.clone(),
            app_mode: config.app.mode,
            launched: false,
            displays_opened: false,
            default_display: None,
            logger: OnceCell::new(),
            menus: OnceCell::new(),
            native_dialogs: OnceCell::new(),
            disposed: false,
            context,
            config,
        };

        if system.config.display.open_default_display {
            system.create_default_display()?;
        }
        info!(
            "System: ready on '{}' driver with {:?}",
            system.context.driver_name(),
            system.context.capabilities()
        );
        Ok(system)
    }

    /// Builds the configured backend and initializes it.
    pub fn from_config(config: SystemConfig) -> Result<Self> {
        let driver = create_driver(&config);
        Self::new(config, driver)
    }

    fn check(&self) -> Result<()> {
        if self.disposed {
            Err(SystemError::Disposed)
        } else {
            Ok(())
        }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn driver_name(&self) -> &'static str {
        self.context.driver_name()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Releases every native resource and invalidates all handles.
    ///
    /// Handles still held by the caller are reported as
    /// `OutstandingHandles`; they are invalidated regardless and any later
    /// use of them fails with `Disposed`. Disposing twice is a no-op.
    pub fn dispose(&mut self) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        self.default_display = None;
        let (displays, surfaces) = self.context.lifetime().outstanding();
        self.context.lifetime().invalidate();
        self.disposed = true;
        let shutdown = self.context.shutdown();
        info!("System: disposed '{}' driver", self.context.driver_name());

        if displays > 0 || surfaces > 0 {
            warn!(
                "System: disposed with {} display(s) and {} surface(s) still alive",
                displays, surfaces
            );
            return Err(SystemError::OutstandingHandles { displays, surfaces });
        }
        shutdown?;
        Ok(())
    }

    // --- Capabilities & GPU ---

    /// Fixed once the backend is initialized.
    pub fn capabilities(&self) -> Capabilities {
        self.context.capabilities()
    }

    /// True when every flag of `capability` is available.
    pub fn has_capability(&self, capability: Capabilities) -> bool {
        self.capabilities().has(capability)
    }

    /// Preference consulted by later `create_display` calls. Displays fall
    /// back to software rendering when the backend cannot honor it.
    pub fn set_gpu_acceleration(&mut self, enabled: bool) {
        if enabled && !self.has_capability(Capabilities::GPU_ACCELERATION_SWITCH) {
            warn!("System: backend cannot switch GPU acceleration, keeping preference anyway");
        }
        debug!("System: GPU acceleration preference = {}", enabled);
        self.gpu_acceleration = enabled;
    }

    pub fn gpu_acceleration(&self) -> bool {
        self.gpu_acceleration
    }

    // --- Displays ---

    /// Logical size used for the default display.
    pub fn default_new_display_size(&self) -> (i32, i32) {
        (
            self.config.display.default_width,
            self.config.display.default_height,
        )
    }

    /// Opens a new display. The caller owns it; dropping it closes the window.
    pub fn create_display(&mut self, width: i32, height: i32, scale: i32) -> Result<Display> {
        self.check()?;
        let display = self.open_display(width, height, scale, false)?;
        Ok(display)
    }

    fn open_display(
        &mut self,
        width: i32,
        height: i32,
        scale: i32,
        is_default: bool,
    ) -> Result<Display> {
        let display = Display::open(
            Rc::clone(&self.context),
            width,
            height,
            scale,
            self.gpu_acceleration,
            self.app_name.clone(),
            is_default,
        )?;
        self.displays_opened = true;
        Ok(display)
    }

    /// Opens the default display, owned by the `System`.
    pub fn create_default_display(&mut self) -> Result<&mut Display> {
        self.check()?;
        if self.default_display.is_some() {
            return Err(SystemError::creation(
                ResourceKind::Display,
                "the default display already exists",
            ));
        }
        let (width, height) = self.default_new_display_size();
        let scale = self.config.display.default_scale;
        let display = self.open_display(width, height, scale, true)?;
        Ok(self.default_display.insert(display))
    }

    /// The default display, if one was opened. Never creates one.
    pub fn default_display(&self) -> Option<&Display> {
        self.default_display.as_ref()
    }

    pub fn default_display_mut(&mut self) -> Option<&mut Display> {
        self.default_display.as_mut()
    }

    // --- Surfaces ---

    fn new_surface(
        &self,
        width: i32,
        height: i32,
        format: PixelFormat,
        color_space: Option<ColorSpaceRef>,
    ) -> Result<Surface> {
        self.check()?;
        let (width, height) = checked_size(width, height)?;
        let token = HandleToken::new(self.context.lifetime(), HandleKind::Surface);
        Surface::new(width, height, format, color_space, token)
    }

    /// Allocates a surface in the backend's native pixel format.
    pub fn create_surface(
        &self,
        width: i32,
        height: i32,
        color_space: Option<ColorSpaceRef>,
    ) -> Result<Surface> {
        self.new_surface(width, height, self.context.native_format(), color_space)
    }

    /// Allocates a surface in `PixelFormat::Rgba8` regardless of the backend.
    pub fn create_rgba_surface(
        &self,
        width: i32,
        height: i32,
        color_space: Option<ColorSpaceRef>,
    ) -> Result<Surface> {
        self.new_surface(width, height, PixelFormat::Rgba8, color_space)
    }

    /// Decodes an image file in the backend's native pixel format.
    pub fn load_surface(&self, path: impl AsRef<Path>) -> Result<Surface> {
        self.load_with_format(path.as_ref(), self.context.native_format())
    }

    /// Decodes an image file in `PixelFormat::Rgba8`.
    pub fn load_rgba_surface(&self, path: impl AsRef<Path>) -> Result<Surface> {
        self.load_with_format(path.as_ref(), PixelFormat::Rgba8)
    }

    fn load_with_format(&self, path: &Path, format: PixelFormat) -> Result<Surface> {
        self.check()?;
        let token = HandleToken::new(self.context.lifetime(), HandleKind::Surface);
        Surface::load_png(path, format, token)
    }

    // --- Color management ---

    /// Appends sRGB and the profile of every connected monitor to `out`.
    /// Existing entries are kept.
    pub fn list_color_spaces(&self, out: &mut Vec<ColorSpaceRef>) -> Result<()> {
        self.check()?;
        out.push(self.context.srgb().clone());
        if self.has_capability(Capabilities::COLOR_SPACES) {
            for monitor in self.context.monitors()? {
                out.push(self.context.profile_space(&monitor));
            }
        }
        Ok(())
    }

    /// Wraps a descriptor into a shared color space.
    ///
    /// Every call yields a new handle. Compare color spaces with `==`, which
    /// compares descriptors.
    pub fn create_color_space(&self, descriptor: ColorSpaceDescriptor) -> Result<ColorSpaceRef> {
        self.check()?;
        descriptor.validate()?;
        if !descriptor.is_srgb() && !self.has_capability(Capabilities::COLOR_SPACES) {
            return Err(SystemError::UnsupportedCapability(Capabilities::COLOR_SPACES));
        }
        debug!("System: created color space '{}'", descriptor.name());
        Ok(ColorSpace::shared(descriptor))
    }

    pub fn convert_between_color_space(
        &self,
        src: &ColorSpaceRef,
        dst: &ColorSpaceRef,
    ) -> Result<ColorSpaceConversion> {
        self.check()?;
        ColorSpaceConversion::new(src.clone(), dst.clone())
    }

    /// Sets the color space of displays without their own override. `None`
    /// makes them track the profile of whichever monitor shows them.
    pub fn set_displays_color_space(&mut self, color_space: Option<ColorSpaceRef>) -> Result<()> {
        self.check()?;
        let non_srgb = color_space.as_ref().is_some_and(|cs| !cs.is_srgb());
        if non_srgb && !self.has_capability(Capabilities::COLOR_SPACES) {
            return Err(SystemError::UnsupportedCapability(Capabilities::COLOR_SPACES));
        }
        let policy = DisplayColorSpace::from_option(color_space);
        info!("System: displays color space = {:?}", policy);
        self.context.set_displays_color_space(policy);
        Ok(())
    }

    pub fn displays_color_space(&self) -> DisplayColorSpace {
        self.context.displays_color_space()
    }

    // --- App lifecycle hooks ---

    /// Names the application. Best-effort after `finish_launching`.
    pub fn set_app_name(&mut self, name: impl Into<String>) -> Result<()> {
        self.check()?;
        let name = name.into();
        if self.launched {
            warn!("System: set_app_name('{}') after launch may have no effect", name);
        }
        self.context.apply(DriverRequest::SetAppName(name.clone()))?;
        self.app_name = name;
        Ok(())
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Best-effort after `finish_launching`.
    pub fn set_app_mode(&mut self, mode: AppMode) -> Result<()> {
        self.check()?;
        if self.launched {
            warn!("System: set_app_mode({:?}) after launch may have no effect", mode);
        }
        self.context.apply(DriverRequest::SetAppMode(mode))?;
        self.app_mode = mode;
        Ok(())
    }

    pub fn app_mode(&self) -> AppMode {
        self.app_mode
    }

    /// Brings the application to the foreground.
    pub fn activate_app(&self) -> Result<()> {
        self.check()?;
        self.context.apply(DriverRequest::ActivateApp)?;
        Ok(())
    }

    /// Signals that startup is done. Later calls are ignored.
    pub fn finish_launching(&mut self) -> Result<()> {
        self.check()?;
        if self.launched {
            debug!("System: finish_launching called again, ignoring");
            return Ok(());
        }
        self.context.apply(DriverRequest::FinishLaunching)?;
        self.launched = true;
        info!("System: launch finished");
        Ok(())
    }

    pub fn is_launched(&self) -> bool {
        self.launched
    }

    /// Chooses the Wintab tablet API. Only honored before the first display
    /// is opened.
    pub fn use_wintab_api(&mut self, enable: bool) -> Result<()> {
        self.check()?;
        if self.displays_opened {
            warn!("System: use_wintab_api({}) ignored after the first display", enable);
            return Ok(());
        }
        self.context.apply(DriverRequest::UseWintab(enable))?;
        Ok(())
    }

    // --- Input polling ---

    /// Live key state, independent of the event queue.
    pub fn is_key_pressed(&self, scancode: KeyScancode) -> Result<bool> {
        self.check()?;
        let pressed = self.context.key_pressed(scancode)?;
        trace!("System: is_key_pressed({:?}) = {}", scancode, pressed);
        Ok(pressed)
    }

    pub fn key_modifiers(&self) -> Result<KeyModifiers> {
        self.check()?;
        Ok(self.context.key_modifiers()?)
    }

    /// Character the active layout produces for `scancode`.
    ///
    /// With dead-key translation on, an accent key yields `None` and is
    /// composed into the next character. With it off, the accent itself is
    /// returned immediately.
    pub fn get_unicode_from_scancode(&mut self, scancode: KeyScancode) -> Result<Option<char>> {
        self.check()?;
        let mapping = self.context.key_mapping(scancode)?;
        let ch = if self.translate_dead_keys {
            self.composer.feed(mapping)
        } else {
            mapping.unicode
        };
        trace!("System: {:?} -> {:?}", scancode, ch);
        Ok(ch)
    }

    /// Switches between text-composition and shortcut-style mapping. Any
    /// held accent is dropped.
    pub fn set_translate_dead_keys(&mut self, enabled: bool) {
        if self.translate_dead_keys != enabled {
            debug!("System: translate dead keys = {}", enabled);
        }
        self.translate_dead_keys = enabled;
        self.composer.reset();
    }

    pub fn translate_dead_keys(&self) -> bool {
        self.translate_dead_keys
    }

    // --- Fonts, events and services ---

    pub fn font_manager(&self) -> Result<&FontManager> {
        self.check()?;
        Ok(&self.font_manager)
    }

    pub fn load_sprite_sheet_font(&self, path: impl AsRef<Path>, scale: i32) -> Result<Font> {
        self.font_manager()?.load_sprite_sheet_font(path, scale)
    }

    pub fn load_true_type_font(&self, path: impl AsRef<Path>, height: i32) -> Result<Font> {
        self.font_manager()?.load_true_type_font(path, height)
    }

    pub fn event_queue(&self) -> Result<&EventQueue> {
        self.check()?;
        Ok(&self.event_queue)
    }

    /// Error sink, created on first use.
    pub fn logger(&self) -> &dyn Logger {
        &**self.logger.get_or_init(|| Box::new(LogFacadeLogger))
    }

    /// Native menu bar, created on first use. `None` when the backend has none.
    pub fn menus(&self) -> Option<&dyn Menus> {
        self.menus
            .get_or_init(|| self.context.with_driver(|driver| driver.menus()))
            .as_deref()
    }

    /// Native file dialogs, created on first use. `None` when the backend has
    /// none.
    pub fn native_dialogs(&self) -> Option<&dyn NativeDialogs> {
        self.native_dialogs
            .get_or_init(|| self.context.with_driver(|driver| driver.native_dialogs()))
            .as_deref()
    }
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("driver", &self.context.driver_name())
            .field("capabilities", &self.context.capabilities())
            .field("gpu_acceleration", &self.gpu_acceleration)
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl Drop for System {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            warn!("System: dispose on drop failed: {}", e);
        }
    }
}
