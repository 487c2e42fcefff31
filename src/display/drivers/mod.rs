// src/display/drivers/mod.rs
//! Platform-specific driver implementations and the startup factory.

pub mod headless;

pub use headless::{HeadlessControl, HeadlessDriver};

use crate::config::{BackendKind, SystemConfig};
use crate::display::driver::PlatformDriver;
use log::info;

/// Selects the driver for the configured backend.
pub fn create_driver(config: &SystemConfig) -> Box<dyn PlatformDriver> {
    match config.platform.backend {
        BackendKind::Headless => {
            info!("Creating headless platform driver");
            Box::new(HeadlessDriver::new(config.headless.clone()))
        }
    }
}
