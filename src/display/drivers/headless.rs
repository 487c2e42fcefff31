// src/display/drivers/headless.rs
//! Headless display driver implementation.
//!
//! Simulates a windowing layer in memory: windows, monitors with color
//! profiles, keyboard state with a US-International layout, app lifecycle
//! hooks, native menus and dialogs. `HeadlessControl` shares the simulated
//! state so callers can inject input and move windows between monitors.

use crate::config::{AppMode, HeadlessConfig};
use crate::display::driver::PlatformDriver;
use crate::display::messages::{
    DriverError, DriverEvent, DriverRequest, DriverResponse, MonitorId, MonitorInfo, WindowId,
    WindowSpec,
};
use crate::keys::{DeadKey, KeyMapping, KeyModifiers, KeyScancode};
use crate::services::{FileDialogRequest, MenuItem, Menus, NativeDialogs};
use log::{debug, info, trace};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessWindow {
    pub width_px: u32,
    pub height_px: u32,
    pub scale: u32,
    pub monitor: MonitorId,
    pub title: String,
    pub gpu_accelerated: bool,
}

#[derive(Debug, Default)]
struct HeadlessState {
    initialized: bool,
    shut_down: bool,
    next_window: u64,
    windows: HashMap<WindowId, HeadlessWindow>,
    monitors: Vec<MonitorInfo>,
    pressed: HashSet<KeyScancode>,
    locks: KeyModifiers,
    layout: HashMap<KeyScancode, KeyMapping>,
    events: VecDeque<DriverEvent>,
    app_name: Option<String>,
    app_mode: Option<AppMode>,
    activations: usize,
    launched: bool,
    wintab: Option<bool>,
    app_menu: Vec<MenuItem>,
    dialog_answer: Option<PathBuf>,
}

impl HeadlessState {
    fn modifiers(&self) -> KeyModifiers {
        self.pressed
            .iter()
            .fold(self.locks, |acc, sc| acc | sc.modifier())
    }

    fn mapping(&self, scancode: KeyScancode) -> KeyMapping {
        let Some(mapping) = self.layout.get(&scancode).copied() else {
            return KeyMapping::none();
        };
        let shifted = self
            .modifiers()
            .intersects(KeyModifiers::SHIFT | KeyModifiers::CAPS_LOCK);
        match mapping.unicode {
            Some(ch) if shifted && mapping.dead.is_none() && ch.is_ascii_lowercase() => {
                KeyMapping::plain(ch.to_ascii_uppercase())
            }
            _ => mapping,
        }
    }

    fn primary_monitor(&self) -> MonitorId {
        self.monitors
            .iter()
            .find(|m| m.primary)
            .or_else(|| self.monitors.first())
            .map(|m| m.id)
            .unwrap_or(MonitorId(0))
    }

    fn window_mut(&mut self, window: WindowId) -> Result<&mut HeadlessWindow, DriverError> {
        self.windows
            .get_mut(&window)
            .ok_or(DriverError::UnknownWindow(window))
    }
}

/// Letters, digits and punctuation of a US-International layout, where the
/// quote and backtick keys are dead accents.
fn us_international_layout() -> HashMap<KeyScancode, KeyMapping> {
    use KeyScancode::*;
    let letters = [
        A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    ];
    let digits = [
        Digit0, Digit1, Digit2, Digit3, Digit4, Digit5, Digit6, Digit7, Digit8, Digit9,
    ];
    let mut layout = HashMap::new();
    for (sc, ch) in letters.iter().zip('a'..='z') {
        layout.insert(*sc, KeyMapping::plain(ch));
    }
    for (sc, ch) in digits.iter().zip('0'..='9') {
        layout.insert(*sc, KeyMapping::plain(ch));
    }
    for (sc, ch) in [
        (Minus, '-'),
        (Equals, '='),
        (OpenBrace, '['),
        (CloseBrace, ']'),
        (Semicolon, ';'),
        (Backslash, '\\'),
        (Comma, ','),
        (Period, '.'),
        (Slash, '/'),
        (Space, ' '),
        (Tab, '\t'),
        (Enter, '\r'),
    ] {
        layout.insert(sc, KeyMapping::plain(ch));
    }
    layout.insert(Quote, KeyMapping::dead(DeadKey::Acute));
    layout.insert(Tilde, KeyMapping::dead(DeadKey::Grave));
    layout
}

pub struct HeadlessDriver {
    config: HeadlessConfig,
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessDriver {
    pub fn new(config: HeadlessConfig) -> Self {
        Self::with_control(config).0
    }

    /// Creates the driver together with a handle onto its simulated state.
    pub fn with_control(config: HeadlessConfig) -> (Self, HeadlessControl) {
        info!(
            "HeadlessDisplayDriver::new() with {} monitor(s)",
            config.monitors.len()
        );
        let state = HeadlessState {
            monitors: config.monitors.clone(),
            layout: us_international_layout(),
            next_window: 1,
            ..HeadlessState::default()
        };
        let state = Rc::new(RefCell::new(state));
        let control = HeadlessControl {
            state: Rc::clone(&state),
        };
        (Self { config, state }, control)
    }

    fn create_window(&mut self, spec: WindowSpec) -> Result<DriverResponse, DriverError> {
        let max = self.config.max_window_px;
        if spec.width_px == 0 || spec.height_px == 0 {
            return Err(DriverError::Refused(format!(
                "empty window {}x{}",
                spec.width_px, spec.height_px
            )));
        }
        if spec.width_px > max || spec.height_px > max {
            return Err(DriverError::Refused(format!(
                "window {}x{} exceeds the {}px limit",
                spec.width_px, spec.height_px, max
            )));
        }
        if spec.gpu_acceleration && !self.config.gpu_available {
            return Err(DriverError::GpuUnavailable);
        }

        let mut state = self.state.borrow_mut();
        let window = WindowId(state.next_window);
        state.next_window += 1;
        let monitor = state.primary_monitor();
        state.windows.insert(
            window,
            HeadlessWindow {
                width_px: spec.width_px,
                height_px: spec.height_px,
                scale: spec.scale,
                monitor,
                title: spec.title,
                gpu_accelerated: spec.gpu_acceleration,
            },
        );
        debug!(
            "HeadlessDisplayDriver: created {} ({}x{} @{}x, gpu={}) on {}",
            window, spec.width_px, spec.height_px, spec.scale, spec.gpu_acceleration, monitor
        );
        Ok(DriverResponse::WindowCreated {
            window,
            gpu_accelerated: spec.gpu_acceleration,
        })
    }
}

impl PlatformDriver for HeadlessDriver {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn handle_request(&mut self, request: DriverRequest) -> Result<DriverResponse, DriverError> {
        {
            let state = self.state.borrow();
            if state.shut_down {
                return Err(DriverError::ShutDown);
            }
            if !state.initialized && !matches!(request, DriverRequest::Init) {
                return Err(DriverError::NotInitialized);
            }
        }

        match request {
            DriverRequest::Init => {
                info!("HeadlessDisplayDriver: Init - returning capabilities");
                self.state.borrow_mut().initialized = true;
                Ok(DriverResponse::InitComplete {
                    capabilities: self.config.capabilities,
                    native_format: self.config.native_format,
                })
            }
            DriverRequest::CreateWindow(spec) => self.create_window(spec),
            DriverRequest::DestroyWindow(window) => {
                let mut state = self.state.borrow_mut();
                state
                    .windows
                    .remove(&window)
                    .ok_or(DriverError::UnknownWindow(window))?;
                debug!("HeadlessDisplayDriver: destroyed {}", window);
                Ok(DriverResponse::WindowDestroyed)
            }
            DriverRequest::ResizeWindow {
                window,
                width_px,
                height_px,
                scale,
            } => {
                let max = self.config.max_window_px;
                if width_px == 0 || height_px == 0 || width_px > max || height_px > max {
                    return Err(DriverError::Refused(format!(
                        "cannot resize to {}x{}",
                        width_px, height_px
                    )));
                }
                let mut state = self.state.borrow_mut();
                let w = state.window_mut(window)?;
                w.width_px = width_px;
                w.height_px = height_px;
                w.scale = scale;
                Ok(DriverResponse::WindowResized)
            }
            DriverRequest::SetTitle { window, title } => {
                info!("HeadlessDisplayDriver: SetTitle {} '{}'", window, title);
                self.state.borrow_mut().window_mut(window)?.title = title;
                Ok(DriverResponse::TitleSet)
            }
            DriverRequest::WindowMonitor(window) => {
                let mut state = self.state.borrow_mut();
                Ok(DriverResponse::Monitor(state.window_mut(window)?.monitor))
            }
            DriverRequest::MoveWindow { window, monitor } => {
                self.state.borrow_mut().move_window(window, monitor)?;
                Ok(DriverResponse::WindowMoved)
            }
            DriverRequest::ListMonitors => {
                Ok(DriverResponse::Monitors(self.state.borrow().monitors.clone()))
            }
            DriverRequest::PollEvents => {
                let events: Vec<DriverEvent> = self.state.borrow_mut().events.drain(..).collect();
                trace!("HeadlessDisplayDriver: PollEvents -> {}", events.len());
                Ok(DriverResponse::Events(events))
            }
            DriverRequest::KeyState(scancode) => {
                let state = self.state.borrow();
                let pressed =
                    state.pressed.contains(&scancode) || state.locks.intersects(scancode.modifier());
                Ok(DriverResponse::KeyPressed(pressed))
            }
            DriverRequest::KeyModifiers => {
                Ok(DriverResponse::Modifiers(self.state.borrow().modifiers()))
            }
            DriverRequest::KeyMapping(scancode) => {
                Ok(DriverResponse::Mapping(self.state.borrow().mapping(scancode)))
            }
            DriverRequest::SetAppName(name) => {
                info!("HeadlessDisplayDriver: SetAppName '{}'", name);
                self.state.borrow_mut().app_name = Some(name);
                Ok(DriverResponse::Applied)
            }
            DriverRequest::SetAppMode(mode) => {
                info!("HeadlessDisplayDriver: SetAppMode {:?}", mode);
                self.state.borrow_mut().app_mode = Some(mode);
                Ok(DriverResponse::Applied)
            }
            DriverRequest::ActivateApp => {
                self.state.borrow_mut().activations += 1;
                Ok(DriverResponse::Applied)
            }
            DriverRequest::FinishLaunching => {
                info!("HeadlessDisplayDriver: FinishLaunching");
                self.state.borrow_mut().launched = true;
                Ok(DriverResponse::Applied)
            }
            DriverRequest::UseWintab(enable) => {
                self.state.borrow_mut().wintab = Some(enable);
                Ok(DriverResponse::Applied)
            }
            DriverRequest::Shutdown => {
                let mut state = self.state.borrow_mut();
                let leaked = state.windows.len();
                state.windows.clear();
                state.events.clear();
                state.shut_down = true;
                info!(
                    "HeadlessDisplayDriver: Shutdown (released {} window(s))",
                    leaked
                );
                Ok(DriverResponse::ShutdownComplete)
            }
        }
    }

    fn menus(&mut self) -> Option<Box<dyn Menus>> {
        if !self.config.native_services {
            return None;
        }
        Some(Box::new(HeadlessMenus {
            state: Rc::clone(&self.state),
        }))
    }

    fn native_dialogs(&mut self) -> Option<Box<dyn NativeDialogs>> {
        if !self.config.native_services {
            return None;
        }
        Some(Box::new(HeadlessDialogs {
            state: Rc::clone(&self.state),
        }))
    }
}

impl HeadlessState {
    fn move_window(&mut self, window: WindowId, monitor: MonitorId) -> Result<(), DriverError> {
        if !self.monitors.iter().any(|m| m.id == monitor) {
            return Err(DriverError::UnknownMonitor(monitor));
        }
        let w = self.window_mut(window)?;
        if w.monitor != monitor {
            w.monitor = monitor;
            self.events
                .push_back(DriverEvent::MonitorChanged { window, monitor });
        }
        Ok(())
    }
}

struct HeadlessMenus {
    state: Rc<RefCell<HeadlessState>>,
}

impl Menus for HeadlessMenus {
    fn set_app_menu(&self, items: &[MenuItem]) -> Result<(), DriverError> {
        self.state.borrow_mut().app_menu = items.to_vec();
        Ok(())
    }
}

struct HeadlessDialogs {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessDialogs {
    fn answer(&self, request: &FileDialogRequest) -> Option<PathBuf> {
        let path = self.state.borrow_mut().dialog_answer.take()?;
        let accepted = request.extensions.is_empty()
            || path
                .extension()
                .map(|ext| {
                    request
                        .extensions
                        .iter()
                        .any(|e| e.eq_ignore_ascii_case(&ext.to_string_lossy()))
                })
                .unwrap_or(false);
        accepted.then_some(path)
    }
}

impl NativeDialogs for HeadlessDialogs {
    fn open_file(&self, request: &FileDialogRequest) -> Option<PathBuf> {
        self.answer(request)
    }

    fn save_file(&self, request: &FileDialogRequest) -> Option<PathBuf> {
        self.answer(request)
    }
}

/// Handle onto a headless driver's simulated devices.
#[derive(Clone)]
pub struct HeadlessControl {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessControl {
    /// Presses a key, queueing a `KeyDown` event.
    pub fn press_key(&self, scancode: KeyScancode) {
        let mut state = self.state.borrow_mut();
        state.pressed.insert(scancode);
        let modifiers = state.modifiers();
        let unicode = state.mapping(scancode).unicode;
        state.events.push_back(DriverEvent::KeyDown {
            scancode,
            modifiers,
            unicode,
        });
    }

    /// Releases a key, queueing a `KeyUp` event.
    pub fn release_key(&self, scancode: KeyScancode) {
        let mut state = self.state.borrow_mut();
        state.pressed.remove(&scancode);
        let modifiers = state.modifiers();
        state
            .events
            .push_back(DriverEvent::KeyUp { scancode, modifiers });
    }

    /// Toggles lock state (caps/num lock) without a key event.
    pub fn set_locks(&self, locks: KeyModifiers) {
        self.state.borrow_mut().locks = locks & (KeyModifiers::CAPS_LOCK | KeyModifiers::NUM_LOCK);
    }

    /// Remaps a scancode in the active layout.
    pub fn set_key_mapping(&self, scancode: KeyScancode, mapping: KeyMapping) {
        self.state.borrow_mut().layout.insert(scancode, mapping);
    }

    /// Simulates the user dragging a window onto another monitor.
    pub fn move_window(&self, window: WindowId, monitor: MonitorId) -> Result<(), DriverError> {
        self.state.borrow_mut().move_window(window, monitor)
    }

    /// Simulates the user resizing a window.
    pub fn resize_window(&self, window: WindowId, width_px: u32, height_px: u32) -> Result<(), DriverError> {
        let mut state = self.state.borrow_mut();
        let w = state.window_mut(window)?;
        w.width_px = width_px;
        w.height_px = height_px;
        state.events.push_back(DriverEvent::Resized {
            window,
            width_px,
            height_px,
        });
        Ok(())
    }

    pub fn request_close(&self, window: WindowId) {
        self.state
            .borrow_mut()
            .events
            .push_back(DriverEvent::CloseRequested(window));
    }

    pub fn drop_files(&self, files: Vec<PathBuf>) {
        self.state
            .borrow_mut()
            .events
            .push_back(DriverEvent::DropFiles(files));
    }

    /// Path the next native dialog will return.
    pub fn answer_next_dialog(&self, path: Option<PathBuf>) {
        self.state.borrow_mut().dialog_answer = path;
    }

    pub fn window(&self, window: WindowId) -> Option<HeadlessWindow> {
        self.state.borrow().windows.get(&window).cloned()
    }

    pub fn window_count(&self) -> usize {
        self.state.borrow().windows.len()
    }

    pub fn app_name(&self) -> Option<String> {
        self.state.borrow().app_name.clone()
    }

    pub fn app_mode(&self) -> Option<AppMode> {
        self.state.borrow().app_mode
    }

    pub fn activations(&self) -> usize {
        self.state.borrow().activations
    }

    pub fn launched(&self) -> bool {
        self.state.borrow().launched
    }

    pub fn wintab(&self) -> Option<bool> {
        self.state.borrow().wintab
    }

    pub fn app_menu(&self) -> Vec<MenuItem> {
        self.state.borrow().app_menu.clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.borrow().shut_down
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> (HeadlessDriver, HeadlessControl) {
        let (mut driver, control) = HeadlessDriver::with_control(HeadlessConfig::default());
        driver.handle_request(DriverRequest::Init).expect("init");
        (driver, control)
    }

    fn spec(w: u32, h: u32, gpu: bool) -> WindowSpec {
        WindowSpec {
            width_px: w,
            height_px: h,
            scale: 1,
            gpu_acceleration: gpu,
            title: String::new(),
        }
    }

    #[test]
    fn it_should_refuse_requests_before_init() {
        let mut driver = HeadlessDriver::new(HeadlessConfig::default());
        assert_eq!(
            driver.handle_request(DriverRequest::ListMonitors).err(),
            Some(DriverError::NotInitialized)
        );
    }

    #[test]
    fn it_should_open_windows_on_the_primary_monitor() {
        let (mut driver, control) = driver();
        let response = driver
            .handle_request(DriverRequest::CreateWindow(spec(10, 10, false)))
            .expect("create");
        let DriverResponse::WindowCreated { window, .. } = response else {
            panic!("unexpected {:?}", response);
        };
        assert_eq!(control.window(window).map(|w| w.monitor), Some(MonitorId(0)));
        assert_eq!(control.window_count(), 1);
    }

    #[test]
    fn it_should_report_gpu_unavailable_when_configured_without_gpu() {
        let config = HeadlessConfig {
            gpu_available: false,
            ..HeadlessConfig::default()
        };
        let mut driver = HeadlessDriver::new(config);
        driver.handle_request(DriverRequest::Init).expect("init");
        assert_eq!(
            driver
                .handle_request(DriverRequest::CreateWindow(spec(10, 10, true)))
                .err(),
            Some(DriverError::GpuUnavailable)
        );
    }

    #[test]
    fn it_should_queue_a_monitor_change_only_when_the_monitor_differs() {
        let (mut driver, control) = driver();
        let DriverResponse::WindowCreated { window, .. } = driver
            .handle_request(DriverRequest::CreateWindow(spec(10, 10, false)))
            .expect("create")
        else {
            panic!("expected WindowCreated");
        };
        control.move_window(window, MonitorId(0)).expect("same monitor");
        control.move_window(window, MonitorId(1)).expect("other monitor");
        assert!(control.move_window(window, MonitorId(9)).is_err());
        let DriverResponse::Events(events) =
            driver.handle_request(DriverRequest::PollEvents).expect("poll")
        else {
            panic!("expected Events");
        };
        assert_eq!(
            events,
            vec![DriverEvent::MonitorChanged {
                window,
                monitor: MonitorId(1)
            }]
        );
    }

    #[test]
    fn it_should_uppercase_letters_while_shift_is_held() {
        let (mut driver, control) = driver();
        control.press_key(KeyScancode::LShift);
        let response = driver
            .handle_request(DriverRequest::KeyMapping(KeyScancode::Q))
            .expect("mapping");
        assert!(matches!(response, DriverResponse::Mapping(m) if m.unicode == Some('Q')));
    }

    #[test]
    fn it_should_release_all_windows_on_shutdown() {
        let (mut driver, control) = driver();
        driver
            .handle_request(DriverRequest::CreateWindow(spec(10, 10, false)))
            .expect("create");
        driver.handle_request(DriverRequest::Shutdown).expect("shutdown");
        assert_eq!(control.window_count(), 0);
        assert!(control.is_shut_down());
        assert_eq!(
            driver.handle_request(DriverRequest::PollEvents).err(),
            Some(DriverError::ShutDown)
        );
    }
}
