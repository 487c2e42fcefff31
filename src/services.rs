// src/services.rs

//! Narrow interfaces to collaborators that live outside this crate: the
//! logging sink, native menus and native dialogs.

use crate::display::messages::DriverError;
use crate::keys::{KeyModifiers, KeyScancode};
use std::path::PathBuf;

/// Sink for errors the application wants surfaced to the user or a log file.
pub trait Logger {
    fn log_error(&self, message: &str);
}

/// Default `Logger` forwarding to the `log` facade.
#[derive(Debug, Default)]
pub struct LogFacadeLogger;

impl Logger for LogFacadeLogger {
    fn log_error(&self, message: &str) {
        log::error!("{}", message);
    }
}

/// One entry of a native menu.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MenuItem {
    pub label: String,
    pub shortcut: Option<(KeyScancode, KeyModifiers)>,
    pub submenu: Vec<MenuItem>,
}

impl MenuItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_shortcut(mut self, scancode: KeyScancode, modifiers: KeyModifiers) -> Self {
        self.shortcut = Some((scancode, modifiers));
        self
    }

    pub fn with_submenu(mut self, items: Vec<MenuItem>) -> Self {
        self.submenu = items;
        self
    }
}

/// Native application menu bar.
pub trait Menus {
    /// Replaces the application menu. An empty slice removes it.
    fn set_app_menu(&self, items: &[MenuItem]) -> Result<(), DriverError>;
}

/// Parameters of a native file dialog.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileDialogRequest {
    pub title: String,
    pub initial_path: Option<PathBuf>,
    /// Accepted extensions without the dot. Empty accepts everything.
    pub extensions: Vec<String>,
}

/// Native open/save dialogs. `None` means the user cancelled.
pub trait NativeDialogs {
    fn open_file(&self, request: &FileDialogRequest) -> Option<PathBuf>;
    fn save_file(&self, request: &FileDialogRequest) -> Option<PathBuf>;
}
